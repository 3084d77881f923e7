//! 音源地址解析
//!
//! 本地路径优先映射到 CDN；CDN 出错后整个引擎生命周期内回退到本地路径。

/// 音源地址解析器
#[derive(Debug, Clone, Default)]
pub struct SourceResolver {
    cdn_base: Option<String>,
    use_cdn: bool,
}

impl SourceResolver {
    pub fn new(cdn_base: Option<String>) -> Self {
        let cdn_base = cdn_base
            .map(|base| base.trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
        Self {
            use_cdn: cdn_base.is_some(),
            cdn_base,
        }
    }

    /// 不做任何映射
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn cdn_enabled(&self) -> bool {
        self.use_cdn
    }

    /// 停用 CDN，之后所有地址都解析为本地路径
    pub fn disable_cdn(&mut self) {
        self.use_cdn = false;
    }

    /// 解析出交给输出端的地址
    pub fn resolve(&self, src: &str) -> String {
        let Some(base) = self.cdn_base.as_deref() else {
            return src.to_string();
        };

        if src.starts_with("http") {
            if !self.use_cdn {
                if let Some(local) = src.strip_prefix(base) {
                    return local.to_string();
                }
            }
            return src.to_string();
        }

        if self.use_cdn {
            format!("{}/{}", base, src.trim_start_matches('/'))
        } else {
            src.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cdn.example.com/portfolio";

    #[test]
    fn test_local_path_maps_to_cdn() {
        let resolver = SourceResolver::new(Some(format!("{}/", BASE)));
        assert!(resolver.cdn_enabled());
        assert_eq!(
            resolver.resolve("/audio/sonata.mp3"),
            "https://cdn.example.com/portfolio/audio/sonata.mp3"
        );
    }

    #[test]
    fn test_disabled_cdn_strips_base() {
        let mut resolver = SourceResolver::new(Some(BASE.to_string()));
        resolver.disable_cdn();

        assert_eq!(resolver.resolve("/audio/sonata.mp3"), "/audio/sonata.mp3");
        assert_eq!(
            resolver.resolve("https://cdn.example.com/portfolio/audio/sonata.mp3"),
            "/audio/sonata.mp3"
        );
        assert_eq!(
            resolver.resolve("https://elsewhere.org/a.mp3"),
            "https://elsewhere.org/a.mp3"
        );
    }

    #[test]
    fn test_external_url_untouched_while_enabled() {
        let resolver = SourceResolver::new(Some(BASE.to_string()));
        assert_eq!(
            resolver.resolve("https://elsewhere.org/a.mp3"),
            "https://elsewhere.org/a.mp3"
        );
    }

    #[test]
    fn test_identity() {
        let resolver = SourceResolver::identity();
        assert!(!resolver.cdn_enabled());
        assert_eq!(resolver.resolve("/audio/a.mp3"), "/audio/a.mp3");

        let empty = SourceResolver::new(Some(String::new()));
        assert!(!empty.cdn_enabled());
    }
}
