use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Maximum number of alternative names tried by [`CollisionPolicy::Rename`].
pub const MAX_RENAME_ATTEMPTS: usize = 100;

/// What to do when an upload's name is already taken in its directory.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file. Concurrent uploads of the same name: last
    /// write wins.
    #[default]
    #[display("overwrite")]
    Overwrite,
    /// Refuse the upload, leaving the existing file alone.
    #[display("reject")]
    Reject,
    /// Store the upload under the first free `name-N.ext`.
    #[display("rename")]
    Rename,
}

/// Names to try, in order, for an upload called `name`: the name itself,
/// then `stem-1.ext`, `stem-2.ext`, ... up to [`MAX_RENAME_ATTEMPTS`]
/// alternatives.
pub(crate) fn candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };
    std::iter::once(name.to_string()).chain((1..=MAX_RENAME_ATTEMPTS).map(move |n| match extension {
        Some(extension) => format!("{stem}-{n}.{extension}"),
        None => format!("{stem}-{n}"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("app.apk", &["app.apk", "app-1.apk", "app-2.apk"])]
    #[case("my.app.exe", &["my.app.exe", "my.app-1.exe", "my.app-2.exe"])]
    #[case("README", &["README", "README-1", "README-2"])]
    fn test_candidates(#[case] name: &str, #[case] expected: &[&str]) {
        let names: Vec<String> = candidates(name).take(3).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_candidates_are_bounded() {
        assert_eq!(candidates("app.apk").count(), MAX_RENAME_ATTEMPTS + 1);
        assert_eq!(candidates("app.apk").last().unwrap(), format!("app-{MAX_RENAME_ATTEMPTS}.apk"));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(CollisionPolicy::default(), CollisionPolicy::Overwrite);
        assert_eq!(CollisionPolicy::Rename.to_string(), "rename");
    }
}
