//! Partition selection for freshly fetched, cacheable responses.
//!
//! Closed and ordered, first match wins:
//! 1. path is one of the app-shell paths → static
//! 2. path ends in a static-asset extension → static
//! 3. anything else → dynamic

use url::Url;

use crate::deployment::{Deployment, PartitionRole};

/// File extensions routed to the static partition.
pub const STATIC_EXTENSIONS: &[&str] = &["js", "css", "png", "jpg", "svg", "ico"];

/// Choose the partition a newly fetched response is written into.
pub fn select_partition(url: &Url, deployment: &Deployment) -> PartitionRole {
    if deployment.is_app_shell_path(url.path()) {
        return PartitionRole::Static;
    }
    if has_static_extension(url.path()) {
        return PartitionRole::Static;
    }
    PartitionRole::Dynamic
}

fn has_static_extension(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => STATIC_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogsphere_core::AppConfig;

    fn deployment() -> Deployment {
        let config = AppConfig { origin: "https://blog.example.com".into(), ..Default::default() };
        Deployment::from_config(&config).unwrap()
    }

    fn role(path: &str) -> PartitionRole {
        let url = Url::parse("https://blog.example.com").unwrap().join(path).unwrap();
        select_partition(&url, &deployment())
    }

    #[test]
    fn test_app_shell_paths_are_static() {
        for path in ["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png", "/vite.svg"] {
            assert_eq!(role(path), PartitionRole::Static, "{path}");
        }
    }

    #[test]
    fn test_asset_extensions_are_static() {
        for path in ["/assets/index-4f2a.js", "/assets/app.css", "/img/a.png", "/img/b.jpg", "/logo.svg", "/favicon.ico"]
        {
            assert_eq!(role(path), PartitionRole::Static, "{path}");
        }
    }

    #[test]
    fn test_extension_ignores_query() {
        assert_eq!(role("/assets/app.css?v=3"), PartitionRole::Static);
        assert_eq!(role("/api/posts?format=.js"), PartitionRole::Dynamic);
    }

    #[test]
    fn test_everything_else_is_dynamic() {
        for path in ["/posts", "/posts/42", "/api/posts.json", "/about.html", "/fonts/a.woff2", "/img/photo.jpeg"] {
            assert_eq!(role(path), PartitionRole::Dynamic, "{path}");
        }
    }

    #[test]
    fn test_extension_case_and_dotfiles() {
        assert_eq!(role("/IMG/HERO.PNG"), PartitionRole::Static);
        assert_eq!(role("/.js"), PartitionRole::Dynamic);
        assert_eq!(role("/assets.js/readme"), PartitionRole::Dynamic);
    }
}
