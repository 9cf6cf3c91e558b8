mod tests_randomized;
