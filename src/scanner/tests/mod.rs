mod eligibility_tests;
mod mutation_loop_tests;
mod reload_tests;
