pub mod chart;
pub mod compile;
pub mod run;
