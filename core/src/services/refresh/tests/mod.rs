mod flaky_store;
