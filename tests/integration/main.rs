mod cli_test;
mod determinism_test;
mod winner_test;
