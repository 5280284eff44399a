/// Parsed message address.
///
/// `"pan/player/play"` targets the child `player` of top-level item `pan`
/// with command `play`. A bare `"clear"` has no path and is either a
/// container command or a broadcast to every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address<'a> {
    pub path: Option<&'a str>,
    pub command: &'a str,
}

/// Separator between path segments and the command.
pub const PATH_SEPARATOR: char = '/';

impl<'a> Address<'a> {
    pub fn parse(address: &'a str) -> Self {
        match address.rsplit_once(PATH_SEPARATOR) {
            Some((path, command)) if !path.is_empty() => Self {
                path: Some(path),
                command,
            },
            Some((_, command)) => Self {
                path: None,
                command,
            },
            None => Self {
                path: None,
                command: address,
            },
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.path.is_none()
    }

    /// Path segments from the top level downwards.
    pub fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.path.into_iter().flat_map(|p| p.split(PATH_SEPARATOR))
    }
}
