//! Constants for the crane telemetry wire protocol

// Envelope
pub const ENVELOPE_SIZE: usize = 12; // msgId(4) + pierId(4) + craneId(4)

// Message IDs
pub const MSG_POINT_CLOUD: i32 = 0;
pub const MSG_CRANE_ATTITUDE: i32 = 1;
pub const MSG_CRANE_STATUS: i32 = 2;
pub const MSG_DISTANCE: i32 = 3;
pub const MSG_COLLISION_LOG: i32 = 4;
pub const MSG_OPERATOR_INFO: i32 = 6;
pub const MSG_SYSTEM_STATUS: i32 = 7;
pub const MSG_OPERATION_HISTORY: i32 = 8;
pub const MSG_COOPERATION_MESSAGE: i32 = 9;
pub const MSG_REQUEST_COOPERATION_LIST: i32 = 10;
pub const MSG_COOPERATION_ACCEPT: i32 = 11;
pub const MSG_COOPERATION_LIST: i32 = 12;
pub const MSG_PLC_INFO: i32 = 13;
pub const MSG_REQUEST_ADD_USER: i32 = 14;
pub const MSG_LOGIN: i32 = 15; // Request when sent, reply when received
pub const MSG_COOPERATION_REMOVE: i32 = 16;
pub const MSG_REQUEST_LOG_PLAY: i32 = 17;
pub const MSG_INDICATE_LOG_PLAY: i32 = 18;

// Fixed body lengths (kinds not listed have empty bodies)
pub const BODY_CRANE_ATTITUDE: usize = 120;
pub const BODY_CRANE_STATUS: usize = 256;
pub const BODY_COLLISION_LOG: usize = 64092;
pub const BODY_SYSTEM_STATUS: usize = 132;
pub const BODY_OPERATION_HISTORY: usize = 5860;
pub const BODY_PLC_INFO: usize = 172;
pub const BODY_LOGIN_REPLY: usize = 36;
pub const BODY_INDICATE_LOG_PLAY: usize = 72;

// Counted bodies: count field width + record size
pub const POINT_CLOUD_COUNT_FIELD: usize = 8; // u32 count + 4 reserved
pub const POINT_RECORD_SIZE: usize = 24; // xyz f32 + rgb f32
pub const DISTANCE_COUNT_FIELD: usize = 4;
pub const DISTANCE_RECORD_SIZE: usize = 16; // pier i32, crane i32, distance f32, alarm i32
pub const COOPERATION_COUNT_FIELD: usize = 4;
pub const COOPERATION_RECORD_SIZE: usize = 164; // 6 x i32 + 140 byte note
pub const COOPERATION_NOTE_SIZE: usize = 140;
pub const COOPERATION_SLOTS: usize = 10; // Body always carries 10 slots, whatever the count says

// Memory ceilings against corrupt or hostile counts
pub const MAX_POINT_CLOUD_POINTS: usize = 650_000;
pub const MAX_DISTANCE_RECORDS: usize = 4096;

// Pose layout (relative to the convention's offset base)
pub const POSE_MIN_BODY: usize = 40;
pub const POSE_POSITION: usize = 0;
pub const POSE_ROTATION: usize = 12;
pub const POSE_TRANSLATION: usize = 24;
pub const POSE_HOOK1: usize = 36;
pub const POSE_HOOK2: usize = 48;
pub const POSE_HOOK3: usize = 60;

// Numeric sanitization
pub const MAX_ABS_VALUE: f32 = 1_000_000.0;
/// Smallest non-zero magnitude a raw-mode pose word may carry
///
/// Telemetry is metres and degrees. A window that straddles two words
/// reads as a denormal or near-denormal float far below this.
pub const MIN_ABS_RAW_VALUE: f32 = 1e-6;

// Raw per-device mode
pub const SENTENCE_START: u8 = b'$';
pub const SENTENCE_END: u8 = b'\n';
pub const MAX_SENTENCE_LEN: usize = 512;
pub const RAW_FRAME_SIZE_SHORT: usize = 40;
pub const RAW_FRAME_SIZE_FULL: usize = 120;
