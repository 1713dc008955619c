mod test_background_idempotence;
mod test_queue_flush_order;
