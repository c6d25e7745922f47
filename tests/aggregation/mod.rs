mod resilience_test;
mod scenarios_test;
