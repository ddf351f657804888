// Exit codes for scripted runs
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PIPELINE_FAIL: i32 = 1;
pub const EXIT_CONFIG_FAIL: i32 = 2;
pub const EXIT_VERIFY_FAIL: i32 = 3;
