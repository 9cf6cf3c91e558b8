mod tests_delta;
