mod test_reconnect_backoff;
