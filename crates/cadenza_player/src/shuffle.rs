//! 随机池

use std::collections::VecDeque;

use cadenza_library::Track;
use rand::seq::SliceRandom;
use rand::Rng;

/// 尚未播放的曲库随机排列
#[derive(Debug, Clone, Default)]
pub struct ShufflePool {
    tracks: VecDeque<Track>,
}

impl ShufflePool {
    /// 从曲库重新洗牌，排除 `exclude` 指定的音源
    pub fn build<R: Rng + ?Sized>(library: &[Track], exclude: Option<&str>, rng: &mut R) -> Self {
        let mut tracks: Vec<Track> = library
            .iter()
            .filter(|track| Some(track.src.as_str()) != exclude)
            .cloned()
            .collect();
        tracks.shuffle(rng);
        Self {
            tracks: tracks.into(),
        }
    }

    /// 取出下一首；池耗尽时从曲库重新洗牌。曲库为空时返回 `None`
    pub fn pull<R: Rng + ?Sized>(
        &mut self,
        library: &[Track],
        exclude: Option<&str>,
        rng: &mut R,
    ) -> Option<Track> {
        if let Some(src) = exclude {
            self.tracks.retain(|track| track.src != src);
        }

        if self.tracks.is_empty() {
            *self = Self::build(library, exclude, rng);
        }

        self.tracks.pop_front()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library() -> Vec<Track> {
        (1..=5)
            .map(|i| Track::new(format!("Piece {}", i), format!("/audio/{}.mp3", i)))
            .collect()
    }

    #[test]
    fn test_build_excludes_current() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = ShufflePool::build(&library(), Some("/audio/3.mp3"), &mut rng);

        assert_eq!(pool.len(), 4);
        assert!(pool.tracks.iter().all(|t| t.src != "/audio/3.mp3"));
    }

    #[test]
    fn test_pull_drains_then_refills() {
        let library = library();
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = ShufflePool::build(&library, None, &mut rng);

        let mut seen: Vec<_> = (0..5)
            .map(|_| pool.pull(&library, None, &mut rng).unwrap().src)
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 5);
        assert!(pool.is_empty());

        let last = "/audio/2.mp3";
        let refill = pool.pull(&library, Some(last), &mut rng).unwrap();
        assert_ne!(refill.src, last);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_pull_skips_excluded_entries() {
        let library = vec![Track::new("A", "a"), Track::new("B", "b")];
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = ShufflePool::build(&library, None, &mut rng);

        for _ in 0..10 {
            let track = pool.pull(&library, Some("a"), &mut rng).unwrap();
            assert_eq!(track.src, "b");
        }
    }

    #[test]
    fn test_pull_from_empty_library() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = ShufflePool::default();
        assert!(pool.pull(&[], None, &mut rng).is_none());

        let only = vec![Track::new("A", "a")];
        assert!(pool.pull(&only, Some("a"), &mut rng).is_none());
    }
}
