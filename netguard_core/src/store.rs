//! 客户端持久化状态：令牌、显示名、主题
//!
//! 每项一个文件，放在同一目录下。文件不存在表示未登录或使用默认主题。

use crate::error::Result;
use crate::types::{Session, ThemePreference};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const TOKEN_FILE: &str = ".token";
const PARENT_NAME_FILE: &str = ".parent_name";
const THEME_FILE: &str = ".theme";

/// 本地状态目录
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(name)) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 登录后写入令牌和显示名
    pub fn save_session(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(TOKEN_FILE), &session.token)?;
        fs::write(self.path(PARENT_NAME_FILE), &session.parent_display_name)?;
        debug!("Session saved to {}", self.dir.display());
        Ok(())
    }

    /// 没有令牌时返回 None；缺少显示名时默认 "Parent"
    pub fn load_session(&self) -> Result<Option<Session>> {
        let token = match self.read(TOKEN_FILE)? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };
        let parent_display_name = self
            .read(PARENT_NAME_FILE)?
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Parent".to_string());
        Ok(Some(Session {
            token,
            parent_display_name,
        }))
    }

    /// 登出时删除令牌和显示名
    pub fn clear_session(&self) -> Result<()> {
        self.remove(TOKEN_FILE)?;
        self.remove(PARENT_NAME_FILE)?;
        Ok(())
    }

    pub fn theme(&self) -> Result<ThemePreference> {
        Ok(self
            .read(THEME_FILE)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn save_theme(&self, theme: ThemePreference) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(THEME_FILE), theme.as_str())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert_eq!(store.load_session().unwrap(), None);

        let session = Session {
            token: "jwt".into(),
            parent_display_name: "John Smith".into(),
        };
        store.save_session(&session).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session));

        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
        // 重复清理不报错
        store.clear_session().unwrap();
    }

    #[test]
    fn test_missing_name_defaults_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "jwt\n").unwrap();
        let session = StateStore::new(dir.path()).load_session().unwrap().unwrap();
        assert_eq!(session.token, "jwt");
        assert_eq!(session.parent_display_name, "Parent");
    }

    #[test]
    fn test_theme_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested"));
        assert_eq!(store.theme().unwrap(), ThemePreference::Light);
        store.save_theme(ThemePreference::Dark).unwrap();
        assert_eq!(store.theme().unwrap(), ThemePreference::Dark);
        // 存储的主题在 clear_session 后保留
        store.clear_session().unwrap();
        assert_eq!(store.theme().unwrap(), ThemePreference::Dark);
    }
}
