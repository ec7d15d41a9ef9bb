pub mod rolling_mean;
