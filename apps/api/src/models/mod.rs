pub mod employee;
pub mod posting;
