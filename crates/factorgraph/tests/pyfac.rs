//! Marginals of two small conditional-probability graphs.

use approx::assert_abs_diff_eq;
use factorgraph::prelude::*;
use ndarray::array;
use pretty_assertions::assert_eq;

fn assert_pmf(rv: &RandomVariable, expected: &[Float]) {
    let pmf: Vec<Float> = rv
        .as_discrete()
        .expect("the fixtures are discrete")
        .pmf()
        .iter()
        .copied()
        .collect();
    assert_eq!(pmf.len(), expected.len());
    // the reference values are only quoted to seven decimals
    for (actual, expected) in pmf.iter().zip(expected) {
        assert_abs_diff_eq!(actual, expected, epsilon = 5.0e-7);
    }
}

/// p(a | b)·p(b) with a ternary and b binary.
#[test]
fn toy_graph() {
    let mut graph = FactorGraph::new();
    let a = graph.add_variable(VNode::new("a", RvKind::Discrete));
    let b = graph.add_variable(VNode::new("b", RvKind::Discrete));

    let pb = Discrete::new(array![0.3, 0.7].into_dyn(), vec![b.id()]).expect("rank 1");
    let pb = graph.add_factor(FNode::new("Pb", Some(pb.into())));

    let pab = array![[0.2, 0.8], [0.4, 0.6], [0.1, 0.9]].into_dyn();
    let pab = Discrete::new(pab, vec![a.id(), b.id()]).expect("rank 2");
    let pab = graph.add_factor(FNode::new("Pab", Some(pab.into())));

    for (u, v) in [(b, pb), (a, pab), (b, pab)] {
        graph.add_edge(u, v).expect("both nodes are in the graph");
    }

    sum_product(&mut graph, None).expect("the graph is a tree");

    // the prior factor forwards itself unchanged
    let msg = graph.get_message(pb.0, b.0).expect("the edge exists");
    assert_pmf(msg, &[0.3, 0.7]);

    let marginal = graph.belief(a, true).expect("a is a variable");
    assert_pmf(&marginal, &[0.340_659_34, 0.296_703_3, 0.362_637_36]);

    let marginal = graph.belief(b, true).expect("b is a variable");
    assert_pmf(&marginal, &[0.115_384_62, 0.884_615_38]);
}

/// Four chained variables of growing cardinality, with a ternary factor.
#[test]
fn test_graph() {
    let mut graph = FactorGraph::new();
    let a = graph.add_variable(VNode::new("a", RvKind::Discrete));
    let b = graph.add_variable(VNode::new("b", RvKind::Discrete));
    let c = graph.add_variable(VNode::new("c", RvKind::Discrete));
    let d = graph.add_variable(VNode::new("d", RvKind::Discrete));

    let pa = Discrete::new(array![0.3, 0.7].into_dyn(), vec![a.id()]).expect("rank 1");
    let pa = graph.add_factor(FNode::new("Pa", Some(pa.into())));

    let pba = array![[0.2, 0.8], [0.4, 0.6], [0.1, 0.9]].into_dyn();
    let pba = Discrete::new(pba, vec![b.id(), a.id()]).expect("rank 2");
    let pba = graph.add_factor(FNode::new("Pba", Some(pba.into())));

    let pdca = array![
        [[3.0, 1.0], [1.2, 0.4], [0.1, 0.9], [0.1, 0.9]],
        [[11.0, 9.0], [8.8, 9.4], [6.4, 0.1], [8.8, 9.4]],
        [[3.0, 2.0], [2.0, 2.0], [2.0, 2.0], [3.0, 2.0]],
        [[0.3, 0.7], [0.44, 0.56], [0.37, 0.63], [0.44, 0.56]],
        [[0.2, 0.1], [0.64, 0.44], [0.37, 0.63], [0.2, 0.1]]
    ]
    .into_dyn();
    let pdca = Discrete::new(pdca, vec![d.id(), c.id(), a.id()]).expect("rank 3");
    let pdca = graph.add_factor(FNode::new("Pdca", Some(pdca.into())));

    for (u, v) in [(a, pa), (b, pba), (a, pba), (d, pdca), (c, pdca), (a, pdca)] {
        graph.add_edge(u, v).expect("both nodes are in the graph");
    }

    sum_product(&mut graph, None).expect("the graph is a tree");

    let marginal = graph.belief(a, true).expect("a is a variable");
    assert_pmf(&marginal, &[0.137_555_39, 0.862_444_61]);

    let marginal = graph.belief(b, true).expect("b is a variable");
    assert_pmf(&marginal, &[0.339_282_27, 0.303_588_63, 0.357_129_1]);

    let marginal = graph.belief(c, true).expect("c is a variable");
    assert_pmf(
        &marginal,
        &[0.303_781_28, 0.292_169_47, 0.110_075_84, 0.293_973_41],
    );

    let marginal = graph.belief(d, true).expect("d is a variable");
    assert_pmf(
        &marginal,
        &[0.076_011, 0.653_887_24, 0.187_400_39, 0.053_417_87, 0.029_283_5],
    );
}
