//! 向导会话快照，负责页面刷新后的状态恢复
//!
//! 原则：每个向导实例一个完整的可序列化快照，显式的
//! save / restore / clear 三个操作，以传入的会话 id 作为键。
//! 不是持久存储：向导完成或取消时即清除。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::builder::ExpressionBuilder;
use crate::formula::CustomDataSet;

/// 会话存储错误
#[derive(Debug, Error)]
#[error("会话存储错误: {message}")]
pub struct SessionError {
    pub message: String,
}

impl SessionError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

/// 一个向导会话的完整快照：构建器状态、自定义数据集合、
/// 以及尚未提交的公式名输入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WizardSnapshot {
    pub builder: ExpressionBuilder,
    pub custom_data: CustomDataSet,
    pub name_input: String,
}

/// 基于文件的会话存储：每个会话 id 对应存储目录下的一个JSON文件。
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    /// 保存快照，覆盖同一会话之前的快照
    pub fn save(&self, session_id: &str, snapshot: &WizardSnapshot) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SessionError::new(format!("无法创建存储目录 {}: {}", self.dir.display(), e))
        })?;
        let path = self.path_for(session_id);
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| SessionError::new(format!("无法序列化快照: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| SessionError::new(format!("无法写入 {}: {}", path.display(), e)))?;
        tracing::debug!(session_id, "session snapshot saved");
        Ok(())
    }

    /// 恢复快照；不存在时返回 None（不是错误），损坏的JSON是错误
    pub fn restore(&self, session_id: &str) -> Result<Option<WizardSnapshot>, SessionError> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| SessionError::new(format!("无法读取 {}: {}", path.display(), e)))?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| SessionError::new(format!("无法解析快照 {}: {}", path.display(), e)))?;
        Ok(Some(snapshot))
    }

    /// 清除会话快照；快照不存在时是空操作
    pub fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        let path = self.path_for(session_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::new(format!(
                "无法删除 {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::NamedFormula;

    fn temp_store(name: &str) -> SessionStore {
        let dir = std::env::temp_dir().join(format!("formula_workbench_test_{}", name));
        fs::remove_dir_all(&dir).ok();
        SessionStore::new(dir)
    }

    fn sample_snapshot() -> WizardSnapshot {
        let mut snapshot = WizardSnapshot::default();
        snapshot.builder.append_left_paren();
        snapshot.builder.append_data_ref("a");
        snapshot.builder.append_operator("+");
        snapshot.builder.append_number("5");
        snapshot.builder.append_right_paren();
        snapshot
            .custom_data
            .push_formula(NamedFormula::new("sum", "a+b"));
        snapshot.custom_data.toggle_historized("sum");
        snapshot.name_input = "draftName".to_string();
        snapshot
    }

    #[test]
    fn test_save_and_restore_round_trip() {
        let store = temp_store("round_trip");
        let snapshot = sample_snapshot();

        store.save("wizard-1", &snapshot).unwrap();
        let restored = store.restore("wizard-1").unwrap().unwrap();
        assert_eq!(restored, snapshot);
        // 恢复后的构建器可以继续操作
        let mut builder = restored.builder;
        builder.append_operator("*");
        builder.append_number("2");
        assert_eq!(builder.render(), "(a+5)*2");
    }

    #[test]
    fn test_restore_missing_is_none() {
        let store = temp_store("missing");
        assert!(store.restore("nope").unwrap().is_none());
    }

    #[test]
    fn test_sessions_are_keyed_separately() {
        let store = temp_store("keyed");
        let snapshot = sample_snapshot();
        store.save("wizard-1", &snapshot).unwrap();

        assert!(store.restore("wizard-2").unwrap().is_none());
        assert!(store.restore("wizard-1").unwrap().is_some());
    }

    #[test]
    fn test_clear_removes_snapshot() {
        let store = temp_store("clear");
        store.save("wizard-1", &sample_snapshot()).unwrap();
        store.clear("wizard-1").unwrap();
        assert!(store.restore("wizard-1").unwrap().is_none());
        // 再次清除是空操作
        store.clear("wizard-1").unwrap();
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let store = temp_store("corrupt");
        store.save("wizard-1", &sample_snapshot()).unwrap();
        let path = store.path_for("wizard-1");
        fs::write(&path, "not json").unwrap();
        assert!(store.restore("wizard-1").is_err());
    }
}
