pub mod visa;

pub use visa::VisaRateProvider;
