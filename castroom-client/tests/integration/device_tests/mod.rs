pub mod test_camera_switch;
