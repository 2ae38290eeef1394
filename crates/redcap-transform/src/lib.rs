#![deny(unsafe_code)]

//! Turns one patient's flat records into SQL statements.
//!
//! [`transform_patient`] runs every compiled mapping table through
//! [`build_entities`], which evaluates rules with an [`Evaluator`] and hands
//! finished instances to [`insert_statement`].

pub mod builder;
pub mod evaluator;
pub mod patient;
pub mod scope;
pub mod sql;

pub use builder::{DiagnosticSink, build_entities};
pub use evaluator::{Evaluator, conditional_matches};
pub use patient::{PatientOutput, transform_patient};
pub use scope::Scope;
pub use sql::{insert_statement, is_numeric, search_statement, sql_literal};
