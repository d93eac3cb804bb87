//! Condition parsing and evaluation module
//!
//! This module handles parsing MSBuild condition strings like
//! `'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'` and evaluating them
//! against a [`ConditionEvaluationState`].

mod ast;
pub mod cache;
mod evaluator;
pub mod parser;


pub use ast::*;
pub use cache::*;
pub use evaluator::*;
pub use parser::*;
