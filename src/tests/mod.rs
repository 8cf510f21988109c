mod concurrent_tests;
