use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::watch;

use crate::backend::LauncherBackend;
use crate::engine::models::FeedArticle;
use crate::util::SequenceWatermark;

pub mod html;

/// News articles. Populated only by pushed `FeedUpdated` events; `refresh` merely
/// asks the backend to produce one.
pub struct NewsFeed {
    backend: Arc<dyn LauncherBackend>,
    articles: watch::Sender<Vec<FeedArticle>>,
    watermark: SequenceWatermark,
}

impl NewsFeed {
    pub fn new(backend: Arc<dyn LauncherBackend>) -> Self {
        let (articles, _) = watch::channel(Vec::new());
        Self {
            backend,
            articles,
            watermark: SequenceWatermark::default(),
        }
    }

    pub fn articles(&self) -> Vec<FeedArticle> {
        self.articles.borrow().clone()
    }

    pub async fn refresh(&self) {
        match self.backend.refresh_news_feed().await {
            Ok(()) => debug!("news: refresh requested"),
            Err(err) => error!("news: failed to refresh feed: {err}"),
        }
    }

    pub fn apply(&self, seq: u64, articles: Vec<FeedArticle>) -> bool {
        if !self.watermark.advance(seq) {
            debug!("news: dropping stale feed seq {seq}");
            return false;
        }
        info!("news: {} article(s)", articles.len());
        self.articles.send_replace(articles);
        true
    }
}
