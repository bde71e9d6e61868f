pub mod half_day;
