use std::fs;
use std::io;
use std::path::PathBuf;

/// Credential holder for the API client.
///
/// In-memory by default; when opened against a file the token survives
/// process restarts. `clear` removes both the in-memory token and the
/// backing file.
#[derive(Debug, Default)]
pub struct Session {
    token: Option<String>,
    path: Option<PathBuf>,
}

impl Session {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed session, loading a previously stored token if the
    /// file exists.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let token = match fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };

        Ok(Self {
            token,
            path: Some(path),
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn store(&mut self, token: String) -> io::Result<()> {
        if let Some(path) = &self.path {
            fs::write(path, &token)?;
        }
        self.token = Some(token);
        Ok(())
    }

    pub fn clear(&mut self) -> io::Result<()> {
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
        self.token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session_path() -> PathBuf {
        std::env::temp_dir().join(format!("grain-session-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn in_memory_session_holds_token() {
        let mut session = Session::in_memory();
        assert!(session.token().is_none());

        session.store("tok".into()).unwrap();
        assert_eq!(session.token(), Some("tok"));

        session.clear().unwrap();
        assert!(session.token().is_none());
    }

    #[test]
    fn file_backed_session_survives_reopen() {
        let path = temp_session_path();

        let mut session = Session::open(&path).unwrap();
        assert!(session.token().is_none());
        session.store("tok".into()).unwrap();

        let reopened = Session::open(&path).unwrap();
        assert_eq!(reopened.token(), Some("tok"));

        let mut session = reopened;
        session.clear().unwrap();

        let reopened = Session::open(&path).unwrap();
        assert!(reopened.token().is_none());
    }

    #[test]
    fn clear_without_backing_file_is_fine() {
        let path = temp_session_path();
        let mut session = Session::open(&path).unwrap();
        session.clear().unwrap();
        assert!(session.token().is_none());
    }
}
