use crate::column::Column;
use crate::resolver::ColumnIndex;
use std::collections::{HashMap, HashSet, VecDeque};

/// Reference graph between columns, built from computed columns' argument specs.
///
/// Edges run from a referenced column to the computed column that reads it. Unknown
/// names and the reserved row tokens add no edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: HashMap<String, Vec<String>>,
    order: Vec<String>,
    cyclic: Vec<String>,
}

impl DependencyGraph {
    pub fn from_columns(columns: &[Column]) -> Self {
        let index = ColumnIndex::new(columns);
        let computed: Vec<&Column> = columns.iter().filter(|c| c.is_computed()).collect();
        let computed_ids: HashSet<&str> = computed.iter().map(|c| c.id.as_str()).collect();

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for column in &computed {
            let mut upstream: HashSet<&str> = HashSet::new();
            for name in column.referenced_names() {
                if let Some(target) = index.get(name) {
                    upstream.insert(target.id.as_str());
                }
            }
            let mut upstream: Vec<&str> = upstream.into_iter().collect();
            upstream.sort_unstable();
            let mut degree = 0;
            for up in upstream {
                dependents.entry(up.to_string()).or_default().push(column.id.clone());
                if computed_ids.contains(up) {
                    degree += 1;
                }
            }
            in_degree.insert(column.id.as_str(), degree);
        }

        // Kahn's algorithm, seeded in declared order so independent columns keep it.
        let mut queue: VecDeque<&str> = computed
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut order: Vec<String> = Vec::with_capacity(computed.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            for dep in dependents.get(id).into_iter().flatten() {
                if let Some(d) = in_degree.get_mut(dep.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(dep.as_str());
                    }
                }
            }
        }

        let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
        let cyclic: Vec<String> = computed
            .iter()
            .filter(|c| !placed.contains(c.id.as_str()))
            .map(|c| c.id.clone())
            .collect();
        order.extend(cyclic.iter().cloned());

        DependencyGraph { dependents, order, cyclic }
    }

    /// Computed column ids in an order where every column comes after the computed
    /// columns it reads. Columns on a cycle come last, in declared order.
    pub fn evaluation_order(&self) -> &[String] {
        &self.order
    }

    /// Computed columns that take part in (or hang off) a reference cycle.
    pub fn cyclic(&self) -> &[String] {
        &self.cyclic
    }

    /// Computed columns that read `column_id` directly.
    pub fn direct_dependents(&self, column_id: &str) -> &[String] {
        self.dependents.get(column_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every computed column that reads `column_id` directly or through other computed
    /// columns, nearest first.
    pub fn dependents_of(&self, column_id: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([column_id]);
        while let Some(id) = queue.pop_front() {
            for dep in self.direct_dependents(id) {
                if seen.insert(dep.as_str()) {
                    out.push(dep.clone());
                    queue.push_back(dep.as_str());
                }
            }
        }
        out
    }
}
