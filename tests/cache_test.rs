use epub_illustrator::cache::sqlite::SqliteCache;
use epub_illustrator::cache::{ImageCache, cache_key};
use epub_illustrator::painter::{ImageFormat, Painting};

#[tokio::test]
async fn miss_then_hit() {
    let cache = SqliteCache::in_memory().unwrap();
    let key = cache_key("core", "a lighthouse");

    assert!(cache.get(&key).await.unwrap().is_none());

    cache.put(&key, &Painting::png(vec![1, 2, 3])).await.unwrap();
    let hit = cache.get(&key).await.unwrap().unwrap();
    assert_eq!(hit.data, [1, 2, 3]);
    assert_eq!(hit.format, ImageFormat::Png);
}

#[tokio::test]
async fn put_overwrites() {
    let cache = SqliteCache::in_memory().unwrap();
    cache.put("k", &Painting::png(vec![1])).await.unwrap();
    cache
        .put(
            "k",
            &Painting {
                data: vec![9, 9],
                format: ImageFormat::WebP,
            },
        )
        .await
        .unwrap();

    let hit = cache.get("k").await.unwrap().unwrap();
    assert_eq!(hit.data, [9, 9]);
    assert_eq!(hit.format, ImageFormat::WebP);
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn clear_removes_everything() {
    let cache = SqliteCache::in_memory().unwrap();
    cache.put("a", &Painting::png(vec![1])).await.unwrap();
    cache.put("b", &Painting::png(vec![2])).await.unwrap();
    assert_eq!(cache.len().await.unwrap(), 2);

    cache.clear().await.unwrap();
    assert_eq!(cache.len().await.unwrap(), 0);
    assert!(cache.get("a").await.unwrap().is_none());
}

#[tokio::test]
async fn persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let path = path.to_str().unwrap();

    {
        let cache = SqliteCache::new(path).unwrap();
        cache.put("k", &Painting::png(vec![7])).await.unwrap();
    }

    let cache = SqliteCache::new(path).unwrap();
    assert_eq!(cache.get("k").await.unwrap().unwrap().data, [7]);
}
