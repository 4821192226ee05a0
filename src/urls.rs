use url::Url;
use uuid::Uuid;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Prefix for all recipe-related actions.
    recipes_prefix: String,

    /// Prefix for all group-related actions.
    groups_prefix: String,
}

impl Urls {
    /// Create a new instance. The prefixes should *not* include a trailing slash.
    pub fn new(
        base: impl AsRef<str>,
        recipes_prefix: impl Into<String>,
        groups_prefix: impl Into<String>,
    ) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));

        Urls {
            base,
            recipes_prefix: format!("{}/", recipes_prefix.into()),
            groups_prefix: format!("{}/", groups_prefix.into()),
        }
    }

    pub fn recipes(&self) -> Url {
        self.base
            .join(&self.recipes_prefix)
            .expect("get recipes URL")
    }

    pub fn recipe(&self, id: &Uuid) -> Url {
        let id = format!("{}", id);
        self.recipes()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for recipe {}", id))
    }

    pub fn groups(&self) -> Url {
        self.base.join(&self.groups_prefix).expect("get groups URL")
    }

    pub fn group(&self, id: &Uuid) -> Url {
        let id = format!("{}", id);
        self.groups()
            .join(&id)
            .unwrap_or_else(|_| panic!("get URL for group {}", id))
    }
}
