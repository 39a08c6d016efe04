use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use registrar_core::{collapse_mutations, KeyValueStore, Result, TagGroupsMutation};

/// 待处理标签组变更序列的存储键
const PENDING_TAG_GROUP_MUTATIONS_KEY: &str = "registrar.pending_tag_group_mutations";

/// 旧格式的待添加标签集合存储键
const PENDING_ADD_TAG_GROUPS_KEY: &str = "registrar.pending_add_tag_groups";

/// 旧格式的待移除标签集合存储键
const PENDING_REMOVE_TAG_GROUPS_KEY: &str = "registrar.pending_remove_tag_groups";

/// 持久化的标签组变更队列，严格FIFO。
///
/// 队列以JSON数组形式存储在键值存储里；头部变更发送成功（或被服务端
/// 明确拒绝）后才出队，跨进程重启保持顺序。
#[derive(Clone)]
pub struct TagMutationStore {
    store: Arc<dyn KeyValueStore>,
}

impl TagMutationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 当前待处理的变更序列，解析失败按空队列处理
    pub async fn pending(&self) -> Result<Vec<TagGroupsMutation>> {
        let Some(value) = self.store.get_json(PENDING_TAG_GROUP_MUTATIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_value(value) {
            Ok(mutations) => Ok(mutations),
            Err(e) => {
                warn!("待处理标签组变更解析失败，按空队列处理: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// 覆盖写入变更序列，空序列直接移除存储键
    pub async fn set_pending(&self, mutations: &[TagGroupsMutation]) -> Result<()> {
        if mutations.is_empty() {
            self.store.remove(PENDING_TAG_GROUP_MUTATIONS_KEY).await
        } else {
            let value = serde_json::to_value(mutations)?;
            self.store
                .put_json(PENDING_TAG_GROUP_MUTATIONS_KEY, &value)
                .await
        }
    }

    /// 追加一批新变更并将整个序列折叠为最小等价形式后持久化
    pub async fn append_and_collapse(&self, incoming: Vec<TagGroupsMutation>) -> Result<()> {
        let mut mutations = self.pending().await?;
        mutations.extend(incoming);
        let collapsed = collapse_mutations(mutations);
        self.set_pending(&collapsed).await
    }

    /// 将旧格式的待添加/待移除标签集合折叠进统一的变更序列。
    ///
    /// 一次性数据格式升级，幂等，每次标签相关操作开头都会执行；
    /// 旧键不存在时为空操作。
    pub async fn migrate_legacy(&self) -> Result<()> {
        let add_groups = self.read_legacy_sets(PENDING_ADD_TAG_GROUPS_KEY).await?;
        let remove_groups = self.read_legacy_sets(PENDING_REMOVE_TAG_GROUPS_KEY).await?;

        if add_groups.is_empty() && remove_groups.is_empty() {
            return Ok(());
        }

        debug!(
            "迁移旧格式标签组数据: {}个待添加组, {}个待移除组",
            add_groups.len(),
            remove_groups.len()
        );

        let mut groups: BTreeSet<String> = BTreeSet::new();
        groups.extend(add_groups.keys().cloned());
        groups.extend(remove_groups.keys().cloned());

        let migrated: Vec<TagGroupsMutation> = groups
            .into_iter()
            .map(|group| TagGroupsMutation {
                add: add_groups.get(&group).cloned().unwrap_or_default(),
                remove: remove_groups.get(&group).cloned().unwrap_or_default(),
                group,
            })
            .filter(|m| !m.is_empty())
            .collect();

        self.append_and_collapse(migrated).await?;

        self.store.remove(PENDING_ADD_TAG_GROUPS_KEY).await?;
        self.store.remove(PENDING_REMOVE_TAG_GROUPS_KEY).await
    }

    async fn read_legacy_sets(&self, key: &str) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let Some(value) = self.store.get_json(key).await? else {
            return Ok(BTreeMap::new());
        };
        match serde_json::from_value(value) {
            Ok(sets) => Ok(sets),
            Err(e) => {
                warn!("旧格式标签组数据解析失败，跳过迁移: {e}");
                Ok(BTreeMap::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use registrar_infrastructure::store::MemoryKeyValueStore;
    use serde_json::json;

    use super::*;

    fn tag_store() -> (Arc<MemoryKeyValueStore>, TagMutationStore) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let tag_store = TagMutationStore::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        (store, tag_store)
    }

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pending_roundtrip_and_empty_removes_key() {
        let (store, tag_store) = tag_store();

        let mutations = vec![TagGroupsMutation::add_tags("news", tags(&["a"]).into_iter())];
        tag_store.set_pending(&mutations).await.unwrap();
        assert_eq!(tag_store.pending().await.unwrap(), mutations);

        tag_store.set_pending(&[]).await.unwrap();
        assert!(store
            .get_string(PENDING_TAG_GROUP_MUTATIONS_KEY)
            .await
            .unwrap()
            .is_none());
        assert!(tag_store.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_and_collapse() {
        let (_store, tag_store) = tag_store();

        tag_store
            .append_and_collapse(vec![TagGroupsMutation::add_tags(
                "news",
                tags(&["a", "b"]).into_iter(),
            )])
            .await
            .unwrap();
        tag_store
            .append_and_collapse(vec![TagGroupsMutation::remove_tags(
                "news",
                tags(&["a"]).into_iter(),
            )])
            .await
            .unwrap();

        let pending = tag_store.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].add, tags(&["b"]));
        assert_eq!(pending[0].remove, tags(&["a"]));
    }

    #[tokio::test]
    async fn test_migrate_legacy_folds_old_keys() {
        let (store, tag_store) = tag_store();

        store
            .put_json(
                PENDING_ADD_TAG_GROUPS_KEY,
                &json!({"news": ["a", "b"], "sports": ["c"]}),
            )
            .await
            .unwrap();
        store
            .put_json(PENDING_REMOVE_TAG_GROUPS_KEY, &json!({"news": ["x"]}))
            .await
            .unwrap();

        tag_store.migrate_legacy().await.unwrap();

        let pending = tag_store.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        let news = pending.iter().find(|m| m.group == "news").unwrap();
        assert_eq!(news.add, tags(&["a", "b"]));
        assert_eq!(news.remove, tags(&["x"]));

        // 旧键已清除
        assert!(store
            .get_string(PENDING_ADD_TAG_GROUPS_KEY)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_string(PENDING_REMOVE_TAG_GROUPS_KEY)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_migrate_legacy_is_idempotent() {
        let (store, tag_store) = tag_store();

        store
            .put_json(PENDING_ADD_TAG_GROUPS_KEY, &json!({"news": ["a"]}))
            .await
            .unwrap();

        tag_store.migrate_legacy().await.unwrap();
        let first = tag_store.pending().await.unwrap();

        tag_store.migrate_legacy().await.unwrap();
        let second = tag_store.pending().await.unwrap();

        assert_eq!(first, second);
    }
}
