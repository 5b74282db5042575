//! Curve dependency graph.
//!
//! Nodes are curve names; an edge `a -> b` means `b` names `a` as a
//! prerequisite. The graph is rebuilt from a curve set whenever it is needed
//! and never outlives it.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use strata_core::{MarketError, MarketResult};
use strata_curves::Curve;

/// Prerequisite relationships between the curves of one market.
#[derive(Debug, Clone)]
pub struct CurveGraph {
    graph: DiGraph<String, ()>,
    indices: BTreeMap<String, NodeIndex>,
}

impl CurveGraph {
    /// Builds the graph for `curves`.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Consistency` if a curve names a prerequisite
    /// that is not in `curves`.
    pub fn from_curves(curves: &BTreeMap<String, Curve>) -> MarketResult<Self> {
        let mut graph = DiGraph::with_capacity(curves.len(), curves.len());
        let indices: BTreeMap<String, NodeIndex> = curves
            .keys()
            .map(|name| (name.clone(), graph.add_node(name.clone())))
            .collect();

        for (name, curve) in curves {
            let idx = indices[name];
            for prerequisite in curve.prerequisite_curve_ids() {
                let dep_idx = indices.get(&prerequisite).ok_or_else(|| {
                    MarketError::consistency(format!(
                        "curve '{name}' depends on unknown curve '{prerequisite}'"
                    ))
                })?;
                graph.add_edge(*dep_idx, idx, ());
            }
        }

        Ok(Self { graph, indices })
    }

    fn index(&self, name: &str) -> MarketResult<NodeIndex> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| MarketError::lookup(format!("curve '{name}'")))
    }

    /// Every curve, prerequisites before dependents.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Consistency` if the prerequisites form a cycle.
    pub fn build_order(&self) -> MarketResult<Vec<String>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            MarketError::consistency(format!(
                "curve dependency cycle through '{}'",
                self.graph[cycle.node_id()]
            ))
        })?;
        Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// `name` and every curve it transitively depends on.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if `name` is not a node.
    pub fn closure_of(&self, name: &str) -> MarketResult<BTreeSet<String>> {
        let start = self.index(name)?;
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut closure = BTreeSet::new();
        while let Some(idx) = dfs.next(reversed) {
            closure.insert(self.graph[idx].clone());
        }
        Ok(closure)
    }

    /// Curves `name` transitively depends on, excluding itself.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if `name` is not a node.
    pub fn prerequisites_of(&self, name: &str) -> MarketResult<BTreeSet<String>> {
        let mut closure = self.closure_of(name)?;
        closure.remove(name);
        Ok(closure)
    }

    /// Curves that transitively depend on `name`, excluding itself.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if `name` is not a node.
    pub fn dependents_of(&self, name: &str) -> MarketResult<BTreeSet<String>> {
        let start = self.index(name)?;
        let mut dfs = Dfs::new(&self.graph, start);
        let mut dependents = BTreeSet::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                dependents.insert(self.graph[idx].clone());
            }
        }
        Ok(dependents)
    }
}

/// Instruments `name` depends on directly or through its prerequisite
/// curves.
///
/// # Errors
///
/// Propagates graph lookup errors.
pub fn transitive_instruments(
    graph: &CurveGraph,
    curves: &BTreeMap<String, Curve>,
    name: &str,
) -> MarketResult<BTreeSet<String>> {
    let mut instruments = BTreeSet::new();
    for curve_name in graph.closure_of(name)? {
        if let Some(curve) = curves.get(&curve_name) {
            instruments.extend(curve.prerequisite_instrument_ids());
        }
    }
    Ok(instruments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::types::Currency;

    fn curves(list: Vec<Curve>) -> BTreeMap<String, Curve> {
        list.into_iter().map(|c| (c.name().to_string(), c)).collect()
    }

    fn chain() -> BTreeMap<String, Curve> {
        curves(vec![
            Curve::flat("OIS", Currency::USD, "OIS-ON"),
            Curve::spread("USD-3M", Currency::USD, "OIS", ["BASIS-3M-2Y"]),
            Curve::spread("USD-6M", Currency::USD, "USD-3M", ["BASIS-6M-2Y"]),
            Curve::bootstrapped("EUR", Currency::EUR, ["ZC-EUR-1Y"]),
        ])
    }

    #[test]
    fn test_build_order_puts_prerequisites_first() {
        let graph = CurveGraph::from_curves(&chain()).unwrap();
        let order = graph.build_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("OIS") < pos("USD-3M"));
        assert!(pos("USD-3M") < pos("USD-6M"));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_transitive_sets() {
        let curves = chain();
        let graph = CurveGraph::from_curves(&curves).unwrap();
        assert_eq!(
            graph.prerequisites_of("USD-6M").unwrap(),
            BTreeSet::from(["OIS".to_string(), "USD-3M".to_string()])
        );
        assert_eq!(
            graph.dependents_of("OIS").unwrap(),
            BTreeSet::from(["USD-3M".to_string(), "USD-6M".to_string()])
        );
        let instruments = transitive_instruments(&graph, &curves, "USD-6M").unwrap();
        assert!(instruments.contains("OIS-ON"));
        assert!(instruments.contains("BASIS-3M-2Y"));
        assert!(!instruments.contains("ZC-EUR-1Y"));
    }

    #[test]
    fn test_unknown_prerequisite_is_consistency_error() {
        let curves = curves(vec![Curve::spread("X", Currency::USD, "MISSING", ["S"])]);
        let err = CurveGraph::from_curves(&curves).unwrap_err();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_cycle_is_consistency_error() {
        let curves = curves(vec![
            Curve::spread("A", Currency::USD, "B", ["S1"]),
            Curve::spread("B", Currency::USD, "A", ["S2"]),
        ]);
        let graph = CurveGraph::from_curves(&curves).unwrap();
        assert!(graph.build_order().unwrap_err().is_consistency());
    }
}
