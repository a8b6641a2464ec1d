pub mod test_inbound_offer;
pub mod test_teardown;
pub mod test_track_slots;
