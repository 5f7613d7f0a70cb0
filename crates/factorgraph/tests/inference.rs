//! Exact inference on a tree of four binary variables joined by three
//! identical pair factors.

use approx::assert_abs_diff_eq;
use factorgraph::prelude::*;
use ndarray::array;
use pretty_assertions::assert_eq;

fn pmf_of(rv: &RandomVariable) -> Vec<Float> {
    rv.as_discrete()
        .expect("the fixtures are discrete")
        .pmf()
        .iter()
        .copied()
        .collect()
}

fn assert_pmf(rv: &RandomVariable, expected: &[Float]) {
    let pmf = pmf_of(rv);
    assert_eq!(pmf.len(), expected.len());
    for (actual, expected) in pmf.iter().zip(expected) {
        assert_abs_diff_eq!(actual, expected, epsilon = 1.0e-8);
    }
}

/// fa joins x1 and x2; fb and fc hang x3 and x4 off x2.
fn chain() -> (FactorGraph, [VariableIndex; 4]) {
    let mut graph = FactorGraph::new();
    let x1 = graph.add_variable(VNode::new("x1", RvKind::Discrete));
    let x2 = graph.add_variable(VNode::new("x2", RvKind::Discrete));
    let x3 = graph.add_variable(VNode::new("x3", RvKind::Discrete));
    let x4 = graph.add_variable(VNode::new("x4", RvKind::Discrete));

    let dist = array![[0.3, 0.4], [0.3, 0.0]].into_dyn();
    for (label, left, right) in [("fa", x1, x2), ("fb", x2, x3), ("fc", x2, x4)] {
        let factor = Discrete::new(dist.clone(), vec![left.id(), right.id()])
            .expect("the factor tensor is rank 2");
        let fnode = graph.add_factor(FNode::new(label, Some(factor.into())));
        graph.add_edge(left, fnode).expect("both nodes are in the graph");
        graph.add_edge(right, fnode).expect("both nodes are in the graph");
    }
    (graph, [x1, x2, x3, x4])
}

#[test]
fn sum_product_computes_the_exact_marginals() {
    let (mut graph, [x1, x2, x3, x4]) = chain();
    let belief = sum_product(&mut graph, Some(x1)).expect("the graph is a tree");
    assert_pmf(&belief, &[0.183 / 0.33, 0.147 / 0.33]);
    assert_eq!(belief.dims(), &[x1.id()]);

    // one rooted pass fills in every directed edge, so the remaining
    // beliefs are available without another run
    for (x, expected) in [
        (x1, [0.183, 0.147]),
        (x2, [0.294, 0.036]),
        (x3, [0.162, 0.168]),
        (x4, [0.162, 0.168]),
    ] {
        let unnormalized = graph.belief(x, false).expect("the node is a variable");
        assert_pmf(&unnormalized, &expected);
        assert_eq!(unnormalized.dims(), &[x.id()]);

        let total: Float = expected.iter().sum();
        let normalized = graph.belief(x, true).expect("the node is a variable");
        assert_pmf(&normalized, &[expected[0] / total, expected[1] / total]);
    }
}

#[test]
fn belief_propagation_is_sum_product() {
    let (mut graph, [x1, ..]) = chain();
    let via_bp = belief_propagation(&mut graph, Some(x1)).expect("the graph is a tree");
    let (mut graph, [x1, ..]) = chain();
    let via_spa = sum_product(&mut graph, Some(x1)).expect("the graph is a tree");
    assert_eq!(via_bp, via_spa);
}

#[test]
fn max_product_reports_the_maximum_probability_everywhere() {
    let (mut graph, [x1, x2, x3, x4]) = chain();
    let (maximum, _) = max_product(&mut graph, Some(x1)).expect("the graph is a tree");
    assert_abs_diff_eq!(maximum, 0.048, epsilon = 1.0e-8);

    for (x, normalizer) in [(x1, 0.096), (x2, 0.084), (x3, 0.084), (x4, 0.084)] {
        let unnormalized = graph
            .belief(x, false)
            .and_then(|belief| Ok(belief.max()?))
            .expect("the node is a variable");
        assert_abs_diff_eq!(unnormalized, 0.048, epsilon = 1.0e-8);

        let normalized = graph
            .belief(x, true)
            .and_then(|belief| Ok(belief.max()?))
            .expect("the node is a variable");
        assert_abs_diff_eq!(normalized, 0.048 / normalizer, epsilon = 1.0e-8);
    }
}

#[test]
fn max_sum_reports_the_maximum_log_probability_everywhere() {
    let (mut graph, [x1, x2, x3, x4]) = chain();
    let (maximum, _) = max_sum(&mut graph, Some(x1)).expect("the graph is a tree");
    assert_abs_diff_eq!(maximum, -3.036, epsilon = 1.0e-3);

    for x in [x1, x2, x3, x4] {
        let unnormalized = graph
            .belief(x, false)
            .and_then(|belief| Ok(belief.max()?))
            .expect("the node is a variable");
        assert_abs_diff_eq!(unnormalized, -3.036, epsilon = 1.0e-3);
    }
}

#[test]
fn default_query_is_the_first_variable() {
    let (mut graph, [x1, ..]) = chain();
    let belief = sum_product(&mut graph, None).expect("the graph is a tree");
    assert_eq!(belief.dims(), &[x1.id()]);
}

#[test]
fn a_three_state_middle_variable_broadcasts_correctly() {
    let mut graph = FactorGraph::new();
    let x1 = graph.add_variable(VNode::new("x1", RvKind::Discrete));
    let x2 = graph.add_variable(VNode::new("x2", RvKind::Discrete));
    let x3 = graph.add_variable(VNode::new("x3", RvKind::Discrete));
    let x4 = graph.add_variable(VNode::new("x4", RvKind::Discrete));

    let dist_fa = array![[0.3, 0.2, 0.1], [0.3, 0.0, 0.1]].into_dyn();
    let fa = Discrete::new(dist_fa, vec![x1.id(), x2.id()]).expect("rank 2");
    let fa = graph.add_factor(FNode::new("fa", Some(fa.into())));

    let dist_fb = array![[0.3, 0.2], [0.3, 0.0], [0.1, 0.1]].into_dyn();
    let fb = Discrete::new(dist_fb.clone(), vec![x2.id(), x3.id()]).expect("rank 2");
    let fb = graph.add_factor(FNode::new("fb", Some(fb.into())));

    let fc = Discrete::new(dist_fb, vec![x2.id(), x4.id()]).expect("rank 2");
    let fc = graph.add_factor(FNode::new("fc", Some(fc.into())));

    for (u, v) in [(x1, fa), (x2, fa), (x2, fb), (x3, fb), (x2, fc), (x4, fc)] {
        graph.add_edge(u, v).expect("both nodes are in the graph");
    }

    let belief = sum_product(&mut graph, Some(x4)).expect("the graph is a tree");
    assert_pmf(&belief, &[0.112 / 0.176, 0.064 / 0.176]);
}

#[test]
fn a_factor_over_foreign_variables_is_rejected() {
    let mut graph = FactorGraph::new();
    let x = graph.add_variable(VNode::new("x", RvKind::Discrete));
    let stranger = VariableId(99);
    let factor = Discrete::new(array![0.5, 0.5].into_dyn(), vec![stranger]).expect("rank 1");
    let f = graph.add_factor(FNode::new("f", Some(factor.into())));
    graph.add_edge(x, f).expect("both nodes are in the graph");
    assert!(matches!(
        sum_product(&mut graph, Some(x)),
        Err(Error::FactorDimsMismatch(label)) if label == "f"
    ));
}

#[test]
fn an_observed_variable_pins_its_neighborhood() {
    let (mut graph, [x1, x2, ..]) = chain();
    let delta = Discrete::delta(2, 1, x1.id()).expect("state 1 of 2");
    graph
        .vnode_mut(x1)
        .expect("x1 is a variable")
        .observe(delta.into())
        .expect("the delta is over x1");

    let belief = sum_product(&mut graph, Some(x2)).expect("the graph is a tree");
    // with x1 = 1 the factor fa contributes its second row [0.3, 0.0]
    let expected_unnormalized = [0.3 * 0.49, 0.0];
    let total: Float = expected_unnormalized.iter().sum();
    assert_pmf(&belief, &[expected_unnormalized[0] / total, 0.0]);
}
