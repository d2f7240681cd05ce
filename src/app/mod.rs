// ==========================================
// 焊接生产分析看板 - 应用层
// ==========================================
// 职责: 会话对象，连接表现层与核心引擎
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AnalyticsSession, SessionError};
