use pgpack_domain::constants::{
    ENV_BIND_IP, ENV_HOST_AUTH_METHOD, ENV_MEMORY, ENV_PASSWORD, ENV_SHARED_PRELOAD_LIBRARIES,
    ENV_SKIP_AUTOCONFIG,
};

/// The `POSTGRES_*` variables the entrypoint helper reacts to.
///
/// Built from an iterator so tests never touch the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoConfigEnv {
    pub memory: Option<String>,
    pub skip: bool,
    pub shared_preload_libraries: Option<String>,
    pub bind_ip: Option<String>,
    pub password: Option<String>,
    pub host_auth_method: Option<String>,
}

impl AutoConfigEnv {
    /// Reads the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Builds the view from `(name, value)` pairs; unknown names are ignored and
    /// blank values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut env = Self::default();
        for (key, value) in vars {
            let value: String = value.into();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                ENV_MEMORY => &mut env.memory,
                ENV_SHARED_PRELOAD_LIBRARIES => &mut env.shared_preload_libraries,
                ENV_BIND_IP => &mut env.bind_ip,
                ENV_PASSWORD => &mut env.password,
                ENV_HOST_AUTH_METHOD => &mut env.host_auth_method,
                ENV_SKIP_AUTOCONFIG => {
                    env.skip = is_truthy(value);
                    continue;
                },
                _ => continue,
            };
            *slot = Some(value.to_owned());
        }
        env
    }

    /// Trust authentication lets the server start without a password.
    #[must_use]
    pub fn trusts_host(&self) -> bool {
        self.host_auth_method.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("trust"))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
