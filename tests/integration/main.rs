//! Integration tests

mod e2e_test;
mod portfolio_rules_test;
mod scenarios_test;
mod validator_test;
