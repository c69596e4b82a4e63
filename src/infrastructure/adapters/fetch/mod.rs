//! 远程媒体下载适配器

mod remote_media;

pub use remote_media::{
    FetchError, FetchedMedia, RemoteMediaFetcher, RemoteMediaFetcherConfig,
};
