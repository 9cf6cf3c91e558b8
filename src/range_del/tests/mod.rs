mod tests_tombstone;
