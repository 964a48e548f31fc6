//! Survey structure, submissions, and the derived report types.

pub mod access_code;
pub mod answer;
pub mod api;
pub mod common;
pub mod question;
pub mod submission;
pub mod survey;
