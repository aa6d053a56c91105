//! Tagstep Step
//!
//! This crate defines the contract every pipeline step implements and the
//! dependency-link model a scheduler uses to order steps.
//!
//! A step converges remote state towards a declared target. Instead of an
//! explicit adjacency list, each step declares the [`StepLink`]s it
//! [requires](Step::requires) and the ones it [creates](Step::creates); an
//! edge exists wherever one step creates what another requires.
//!
//! Steps can also [provide](Step::provides) parameters: named values that are
//! only computed when a consumer asks for them.
//!
//! The one concrete step shipped here is [`OutputImageTagStep`], which tags a
//! pipeline image into an externally visible image stream tag.

mod error;
mod link;
mod output_tag;
mod parameter;
mod step;

pub use error::{ParameterError, StepError};
pub use link::StepLink;
pub use output_tag::OutputImageTagStep;
pub use parameter::{ParameterFn, ParameterMap, image_parameter_name};
pub use step::{InputDefinition, Step};
