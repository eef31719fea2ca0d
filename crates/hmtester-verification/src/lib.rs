//! Model checking for the hmtester prediction engine.
//!
//! The tester's verdicts are only as good as its predictions, so this crate
//! explores every short sequence of operations against the engine with
//! Stateright and checks that the scoping rules of both configuration
//! mechanisms hold in every reachable state. See
//! [`prediction_model::PredictionModel`].

pub mod prediction_model;
