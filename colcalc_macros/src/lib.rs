use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn, LitStr, Pat, ReturnType, Type};

// #[function] / #[function(name = "registry_id")]
// Every parameter binds to the positional argument at the same index and must be an
// owned type implementing colcalc::FromArg. The return type must implement
// colcalc::IntoOutcome. `async fn` registers an async callable, anything else a sync one.
#[proc_macro_attribute]
pub fn function(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut name_override: Option<LitStr> = None;
    let attr_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name_override = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported #[function] property, expected `name = \"...\"`"))
        }
    });
    parse_macro_input!(attr with attr_parser);

    let func = parse_macro_input!(item as ItemFn);
    let sig = &func.sig;
    let ident = &sig.ident;

    if let ReturnType::Default = sig.output {
        return syn::Error::new_spanned(sig, "#[function] requires a return value")
            .to_compile_error()
            .into();
    }
    if !sig.generics.params.is_empty() {
        return syn::Error::new_spanned(&sig.generics, "#[function] does not support generic parameters")
            .to_compile_error()
            .into();
    }

    let name_str = name_override
        .map(|lit| lit.value())
        .unwrap_or_else(|| ident.to_string());
    let ident_str = ident.to_string();

    let mut bindings = Vec::with_capacity(sig.inputs.len());
    let mut call_args = Vec::with_capacity(sig.inputs.len());
    for (position, input) in sig.inputs.iter().enumerate() {
        match input {
            FnArg::Typed(pt) => {
                if !matches!(&*pt.pat, Pat::Ident(_)) {
                    return syn::Error::new_spanned(&pt.pat, "#[function] requires simple identifier parameters")
                        .to_compile_error()
                        .into();
                }
                if let Type::Reference(_) = &*pt.ty {
                    return syn::Error::new_spanned(&pt.ty, "#[function] parameters must be owned types")
                        .to_compile_error()
                        .into();
                }
                let ty = &pt.ty;
                let arg = format_ident!("__arg{}", position);
                bindings.push(quote! {
                    let #arg: #ty = ::colcalc::bind_arg::<#ty>(#name_str, #position, &args)?;
                });
                call_args.push(arg);
            }
            FnArg::Receiver(_) => {
                return syn::Error::new_spanned(input, "#[function] does not support receiver parameters")
                    .to_compile_error()
                    .into();
            }
        }
    }

    let shim_ident = format_ident!("__colcalc_shim_{}", ident);

    let (shim, kind) = if sig.asyncness.is_some() {
        (
            quote! {
                #[doc(hidden)]
                #[allow(non_snake_case, unused_variables)]
                fn #shim_ident(args: ::std::vec::Vec<::colcalc::Value>) -> ::colcalc::FnFuture {
                    ::std::boxed::Box::pin(async move {
                        #( #bindings )*
                        ::colcalc::IntoOutcome::into_outcome(#ident( #( #call_args ),* ).await)
                    })
                }
            },
            quote! { ::colcalc::FnKind::Async(#shim_ident) },
        )
    } else {
        (
            quote! {
                #[doc(hidden)]
                #[allow(non_snake_case, unused_variables)]
                fn #shim_ident(args: &[::colcalc::Value]) -> ::colcalc::FnResult {
                    #( #bindings )*
                    ::colcalc::IntoOutcome::into_outcome(#ident( #( #call_args ),* ))
                }
            },
            quote! { ::colcalc::FnKind::Sync(#shim_ident) },
        )
    };

    let output = quote! {
        #func

        #shim

        ::colcalc::inventory::submit! {
            ::colcalc::FnMeta {
                name: #name_str,
                ident: #ident_str,
                mod_path: module_path!(),
                kind: #kind,
            }
        }
    };

    output.into()
}
