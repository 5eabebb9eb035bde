// Copyright 2025 canopy Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The node tree as the owner of the data the engine evicts.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use canopy::{
    EvictionConfig, ExpirationConfig, FifoConfig, Fqn, LruConfig, ManualClock, NodeTree, RegionConfig, RegionManager,
};

fn fqn(path: &str) -> Fqn {
    Fqn::parse(path)
}

fn tree(config: EvictionConfig) -> (NodeTree<String>, ManualClock) {
    let clock = ManualClock::new(1_000);
    let manager = RegionManager::with_clock(config.with_wakeup_interval(Duration::ZERO), Arc::new(clock.clone())).unwrap();
    (NodeTree::with_region_manager(manager), clock)
}

fn fifo(max: usize) -> RegionConfig {
    RegionConfig::new(FifoConfig {
        max_nodes: Some(max),
        ..Default::default()
    })
}

fn process(tree: &NodeTree<String>) {
    let manager = tree.region_manager().unwrap().clone();
    manager.process_all(tree).unwrap();
}

#[test_log::test]
fn test_tree_evicts_leaves() {
    let (tree, _) = tree(EvictionConfig::default().with_default_region(fifo(5)));
    for i in 0..8 {
        tree.put(&fqn(&format!("/n{i}")), "k", i.to_string());
    }
    process(&tree);

    assert_eq!(tree.node_count(), 6);
    assert!(!tree.exists(&fqn("/n2")));
    assert_eq!(tree.get(&fqn("/n3"), "k").as_deref(), Some("3"));
}

#[test_log::test]
fn test_tree_non_recursive_leaves_placeholder() {
    let (tree, _) = tree(EvictionConfig::default().with_default_region(fifo(2)));
    tree.put(&fqn("/a"), "k", "a".to_string());
    tree.put(&fqn("/a/b"), "k", "b".to_string());
    tree.put(&fqn("/c"), "k", "c".to_string());
    process(&tree);

    assert!(tree.is_placeholder(&fqn("/a")));
    assert_eq!(tree.get(&fqn("/a/b"), "k").as_deref(), Some("b"));
    let region = tree.region_manager().unwrap().get_region(&Fqn::root(), false);
    assert_eq!(region.number_of_nodes(), 2);
}

#[test_log::test]
fn test_tree_revived_placeholder_is_tracked() {
    let (tree, _) = tree(EvictionConfig::default().with_default_region(fifo(10)));
    tree.put(&fqn("/a"), "k", "a".to_string());
    tree.put(&fqn("/a/b"), "k", "b".to_string());
    tree.put(&fqn("/c"), "k", "c".to_string());
    process(&tree);
    let region = tree.region_manager().unwrap().get_region(&Fqn::root(), false);
    assert_eq!(region.number_of_nodes(), 3);

    assert!(tree.evict(&fqn("/a"), false));
    process(&tree);
    assert!(tree.is_placeholder(&fqn("/a")));
    assert_eq!(region.number_of_nodes(), 2);
    region.with_eviction_queue(|q| assert!(!q.contains_node_entry(&fqn("/a"))));

    assert!(tree.put_node(&fqn("/a")));
    assert!(!tree.is_placeholder(&fqn("/a")));
    process(&tree);
    assert_eq!(region.number_of_nodes(), 3);
    region.with_eviction_queue(|q| assert!(q.contains_node_entry(&fqn("/a"))));

    assert!(tree.evict(&fqn("/a"), false));
    process(&tree);
    assert_eq!(tree.put(&fqn("/a"), "k", "again".to_string()), None);
    process(&tree);
    assert_eq!(region.number_of_nodes(), 3);
    region.with_eviction_queue(|q| assert!(q.contains_node_entry(&fqn("/a"))));
}

#[test_log::test]
fn test_tree_recursive_eviction() {
    let (tree, _) = tree(EvictionConfig::default().with_default_region(fifo(2)));
    tree.set_recursive_eviction(true);
    tree.put(&fqn("/a"), "k", "a".to_string());
    tree.put(&fqn("/a/b"), "k", "b".to_string());
    tree.put(&fqn("/c"), "k", "c".to_string());
    process(&tree);

    assert!(!tree.exists(&fqn("/a")));
    assert!(!tree.exists(&fqn("/a/b")));
    assert!(tree.exists(&fqn("/c")));

    // The removal of `/a/b` reaches the engine on the next cycle.
    let region = tree.region_manager().unwrap().get_region(&Fqn::root(), false);
    assert_eq!(region.number_of_nodes(), 2);
    process(&tree);
    assert_eq!(region.number_of_nodes(), 1);
}

#[test_log::test]
fn test_tree_regions() {
    let (tree, _) = tree(
        EvictionConfig::default()
            .with_region("/hot", fifo(1))
            .with_region(
                "/warm",
                RegionConfig::new(LruConfig {
                    max_nodes: Some(2),
                    ..Default::default()
                }),
            ),
    );
    for i in 0..3 {
        tree.put(&fqn(&format!("/hot/{i}")), "k", String::new());
        tree.put(&fqn(&format!("/warm/{i}")), "k", String::new());
        tree.put(&fqn(&format!("/cold/{i}")), "k", String::new());
    }
    // Touch the oldest warm node so it outlives its successor.
    tree.get(&fqn("/warm/0"), "k");
    process(&tree);

    assert_eq!(tree.children(&fqn("/cold")).len(), 3);
    assert_eq!(tree.children(&fqn("/warm")), vec![fqn("/warm/0"), fqn("/warm/2")]);
    // The region root is the oldest node of its own region.
    assert!(tree.is_placeholder(&fqn("/hot")));
    assert_eq!(tree.children(&fqn("/hot")), vec![fqn("/hot/2")]);
}

#[test_log::test]
fn test_tree_expiration() {
    let (tree, clock) = tree(EvictionConfig::default().with_default_region(RegionConfig::new(ExpirationConfig::default())));
    tree.put(&fqn("/a"), "expiration", "1500".to_string());
    tree.put(&fqn("/b"), "expiration", "3000".to_string());
    tree.put(&fqn("/c"), "data", "forever".to_string());
    process(&tree);
    assert_eq!(tree.node_count(), 4);

    clock.set(2_000);
    process(&tree);
    assert!(!tree.exists(&fqn("/a")));
    assert!(tree.exists(&fqn("/b")));

    clock.set(5_000);
    process(&tree);
    assert!(!tree.exists(&fqn("/b")));
    assert!(tree.exists(&fqn("/c")));
}

#[test_log::test]
fn test_eviction_thread() {
    let config = EvictionConfig::default()
        .with_wakeup_interval(Duration::from_millis(10))
        .with_default_region(fifo(2));
    let manager = RegionManager::new(config).unwrap();
    let tree = NodeTree::<String>::with_region_manager(manager.clone());
    assert!(manager.start_eviction_thread(Arc::new(tree.clone())).unwrap());
    assert!(manager.is_eviction_thread_running());

    for i in 0..5 {
        tree.put(&fqn(&format!("/{i}")), "k", String::new());
    }
    let deadline = Instant::now() + Duration::from_secs(10);
    while tree.node_count() > 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(tree.node_count(), 3);
    assert!(tree.exists(&fqn("/4")));

    manager.stop_eviction_thread();
    assert!(!manager.is_eviction_thread_running());
}
