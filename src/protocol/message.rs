//! Message kinds, envelopes and frames

use super::constants::*;
use crate::core::types::CraneId;

/// Kind of a framed message
///
/// Login request and reply share id 15 on the wire; inbound it is always a reply.
/// `Sentence` never appears in an envelope: it tags text lines found in raw mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PointCloud,
    CraneAttitude,
    CraneStatus,
    Distance,
    CollisionLog,
    OperatorInfo,
    SystemStatus,
    OperationHistory,
    CooperationMessage,
    RequestCooperationList,
    CooperationAccept,
    CooperationList,
    PlcInfo,
    RequestAddUser,
    Login,
    CooperationRemove,
    RequestLogPlay,
    IndicateLogPlay,
    Sentence,
    Unknown(i32),
}

impl From<i32> for MessageKind {
    fn from(value: i32) -> Self {
        match value {
            MSG_POINT_CLOUD => MessageKind::PointCloud,
            MSG_CRANE_ATTITUDE => MessageKind::CraneAttitude,
            MSG_CRANE_STATUS => MessageKind::CraneStatus,
            MSG_DISTANCE => MessageKind::Distance,
            MSG_COLLISION_LOG => MessageKind::CollisionLog,
            MSG_OPERATOR_INFO => MessageKind::OperatorInfo,
            MSG_SYSTEM_STATUS => MessageKind::SystemStatus,
            MSG_OPERATION_HISTORY => MessageKind::OperationHistory,
            MSG_COOPERATION_MESSAGE => MessageKind::CooperationMessage,
            MSG_REQUEST_COOPERATION_LIST => MessageKind::RequestCooperationList,
            MSG_COOPERATION_ACCEPT => MessageKind::CooperationAccept,
            MSG_COOPERATION_LIST => MessageKind::CooperationList,
            MSG_PLC_INFO => MessageKind::PlcInfo,
            MSG_REQUEST_ADD_USER => MessageKind::RequestAddUser,
            MSG_LOGIN => MessageKind::Login,
            MSG_COOPERATION_REMOVE => MessageKind::CooperationRemove,
            MSG_REQUEST_LOG_PLAY => MessageKind::RequestLogPlay,
            MSG_INDICATE_LOG_PLAY => MessageKind::IndicateLogPlay,
            other => MessageKind::Unknown(other),
        }
    }
}

impl MessageKind {
    /// Wire id, `None` for [`MessageKind::Sentence`]
    pub fn id(&self) -> Option<i32> {
        let id = match self {
            MessageKind::PointCloud => MSG_POINT_CLOUD,
            MessageKind::CraneAttitude => MSG_CRANE_ATTITUDE,
            MessageKind::CraneStatus => MSG_CRANE_STATUS,
            MessageKind::Distance => MSG_DISTANCE,
            MessageKind::CollisionLog => MSG_COLLISION_LOG,
            MessageKind::OperatorInfo => MSG_OPERATOR_INFO,
            MessageKind::SystemStatus => MSG_SYSTEM_STATUS,
            MessageKind::OperationHistory => MSG_OPERATION_HISTORY,
            MessageKind::CooperationMessage => MSG_COOPERATION_MESSAGE,
            MessageKind::RequestCooperationList => MSG_REQUEST_COOPERATION_LIST,
            MessageKind::CooperationAccept => MSG_COOPERATION_ACCEPT,
            MessageKind::CooperationList => MSG_COOPERATION_LIST,
            MessageKind::PlcInfo => MSG_PLC_INFO,
            MessageKind::RequestAddUser => MSG_REQUEST_ADD_USER,
            MessageKind::Login => MSG_LOGIN,
            MessageKind::CooperationRemove => MSG_COOPERATION_REMOVE,
            MessageKind::RequestLogPlay => MSG_REQUEST_LOG_PLAY,
            MessageKind::IndicateLogPlay => MSG_INDICATE_LOG_PLAY,
            MessageKind::Sentence => return None,
            MessageKind::Unknown(id) => *id,
        };
        Some(id)
    }

    /// Body length for kinds with a fixed-size body
    ///
    /// Counted kinds (point cloud, distance, cooperation list) return `None`;
    /// their length depends on a count read after the envelope.
    pub fn fixed_body_len(&self) -> Option<usize> {
        match self {
            MessageKind::PointCloud | MessageKind::Distance | MessageKind::CooperationList => None,
            MessageKind::CraneAttitude => Some(BODY_CRANE_ATTITUDE),
            MessageKind::CraneStatus => Some(BODY_CRANE_STATUS),
            MessageKind::CollisionLog => Some(BODY_COLLISION_LOG),
            MessageKind::SystemStatus => Some(BODY_SYSTEM_STATUS),
            MessageKind::OperationHistory => Some(BODY_OPERATION_HISTORY),
            MessageKind::PlcInfo => Some(BODY_PLC_INFO),
            MessageKind::Login => Some(BODY_LOGIN_REPLY),
            MessageKind::IndicateLogPlay => Some(BODY_INDICATE_LOG_PLAY),
            _ => Some(0),
        }
    }
}

/// One complete message: kind, source and body
///
/// Produced once per frame by the assembler, consumed once by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    pub kind: MessageKind,
    pub source: CraneId,
    pub body: Vec<u8>,
}

/// Output of a frame assembler
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Binary message (header mode, or a raw-mode pose frame)
    Message(MessageEnvelope),
    /// Text line from raw mode, terminator included
    Sentence { source: CraneId, line: Vec<u8> },
}

impl Frame {
    pub fn kind(&self) -> MessageKind {
        match self {
            Frame::Message(env) => env.kind,
            Frame::Sentence { .. } => MessageKind::Sentence,
        }
    }

    pub fn source(&self) -> CraneId {
        match self {
            Frame::Message(env) => env.source,
            Frame::Sentence { source, .. } => *source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_from() {
        assert_eq!(MessageKind::from(0), MessageKind::PointCloud);
        assert_eq!(MessageKind::from(1), MessageKind::CraneAttitude);
        assert_eq!(MessageKind::from(15), MessageKind::Login);
        assert_eq!(MessageKind::from(5), MessageKind::Unknown(5));
        assert_eq!(MessageKind::from(-1), MessageKind::Unknown(-1));
    }

    #[test]
    fn test_message_kind_id() {
        for id in 0..=18 {
            assert_eq!(MessageKind::from(id).id(), Some(id));
        }
        assert_eq!(MessageKind::Sentence.id(), None);
    }

    #[test]
    fn test_fixed_body_table() {
        assert_eq!(MessageKind::CraneAttitude.fixed_body_len(), Some(120));
        assert_eq!(MessageKind::CraneStatus.fixed_body_len(), Some(256));
        assert_eq!(MessageKind::CollisionLog.fixed_body_len(), Some(64092));
        assert_eq!(MessageKind::SystemStatus.fixed_body_len(), Some(132));
        assert_eq!(MessageKind::OperationHistory.fixed_body_len(), Some(5860));
        assert_eq!(MessageKind::PlcInfo.fixed_body_len(), Some(172));
        assert_eq!(MessageKind::Login.fixed_body_len(), Some(36));
        assert_eq!(MessageKind::IndicateLogPlay.fixed_body_len(), Some(72));
        assert_eq!(MessageKind::OperatorInfo.fixed_body_len(), Some(0));
        assert_eq!(MessageKind::Unknown(99).fixed_body_len(), Some(0));
        assert_eq!(MessageKind::PointCloud.fixed_body_len(), None);
        assert_eq!(MessageKind::Distance.fixed_body_len(), None);
        assert_eq!(MessageKind::CooperationList.fixed_body_len(), None);
    }
}
