//! Sum-product over gaussian messages: the belief of a variable with two
//! gaussian priors is the product of their densities.

use approx::assert_abs_diff_eq;
use factorgraph::prelude::*;
use ndarray::array;

#[test]
fn two_priors_multiply_in_information_form() {
    let mut graph = FactorGraph::new();
    let x = graph.add_variable(VNode::new("x", RvKind::Gaussian));

    let f1 = Gaussian::from_mean_and_covariance(array![1.0], array![[2.0]], vec![x.id()])
        .expect("the covariance is invertible");
    let f2 = Gaussian::from_mean_and_covariance(array![3.0], array![[4.0]], vec![x.id()])
        .expect("the covariance is invertible");
    let expected = f1.product(&f2).expect("the dims match");

    let f1 = graph.add_factor(FNode::new("f1", Some(f1.into())));
    let f2 = graph.add_factor(FNode::new("f2", Some(f2.into())));
    graph.add_edge(x, f1).expect("both nodes are in the graph");
    graph.add_edge(x, f2).expect("both nodes are in the graph");

    let belief = sum_product(&mut graph, Some(x)).expect("the graph is a tree");
    let belief = belief.as_gaussian().expect("the messages are gaussian");
    assert_eq!(belief, &expected);

    // W = 1/2 + 1/4, Wm = 1/2 + 3/4, so the posterior mean is 5/3
    let mean = belief.mean().expect("the precision is invertible");
    assert_abs_diff_eq!(mean[0], 5.0 / 3.0, epsilon = 1.0e-12);
}

#[test]
fn unity_edges_do_not_perturb_a_single_prior() {
    let mut graph = FactorGraph::new();
    let x = graph.add_variable(VNode::new("x", RvKind::Gaussian));
    let prior = Gaussian::from_mean_and_covariance(array![4.0], array![[0.5]], vec![x.id()])
        .expect("the covariance is invertible");
    let f = graph.add_factor(FNode::new("prior", Some(prior.clone().into())));
    graph.add_edge(x, f).expect("both nodes are in the graph");

    let belief = sum_product(&mut graph, Some(x)).expect("the graph is a tree");
    assert_eq!(belief.as_gaussian().expect("gaussian"), &prior);
}

#[test]
fn the_gaussian_log_channel_is_unsupported() {
    let mut graph = FactorGraph::new();
    let x = graph.add_variable(VNode::new("x", RvKind::Gaussian));
    let prior = Gaussian::from_mean_and_covariance(array![0.0], array![[1.0]], vec![x.id()])
        .expect("the covariance is invertible");
    let f = graph.add_factor(FNode::new("prior", Some(prior.into())));
    graph.add_edge(x, f).expect("both nodes are in the graph");

    assert!(matches!(
        max_sum(&mut graph, Some(x)),
        Err(Error::RandomVariable(RandomVariableError::LogNotDefined))
    ));
}
