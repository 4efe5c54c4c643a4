//! Page Tree Tests
//!
//! End-to-end behaviour of the tree store through `PageService`: path
//! assignment on create, ancestry reads, subtree moves with cycle rejection,
//! and the trash lifecycle cascading over whole subtrees.

#[cfg(test)]
mod page_tree_tests {
    use anyhow::Result;
    use cotion_core::db::DatabaseService;
    use cotion_core::models::{CreatePageInput, MovePageInput, Page, MAX_POSITION};
    use cotion_core::services::{PageService, PageServiceError};
    use cotion_core::tree::{MaterializedPath, PathCodec};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    const ACTOR: &str = "user-1";

    /// Helper to create a service over a fresh database file
    async fn create_test_service() -> Result<(PageService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db = DatabaseService::new(temp_dir.path().join("test.db")).await?;
        Ok((PageService::new(Arc::new(db)), temp_dir))
    }

    async fn create(service: &PageService, title: &str, parent: Option<&Page>) -> Result<Page> {
        let mut input = CreatePageInput::new(title);
        input.parent_id = parent.map(|p| p.id);
        Ok(service.create_page(input, ACTOR).await?)
    }

    /// Fetch a page in any state, straight from the table
    async fn raw(service: &PageService, id: Uuid) -> Result<Option<Page>> {
        let conn = service.db().connect_with_timeout().await?;
        Ok(cotion_core::db::PageStore::new(&conn).fetch_page(&id).await?)
    }

    fn ids(pages: &[Page]) -> Vec<Uuid> {
        pages.iter().map(|p| p.id).collect()
    }

    /// A ── C ── D      B (moved to root in scenario 3)
    struct Fixture {
        a: Page,
        b: Page,
        c: Page,
        d: Page,
    }

    async fn build_fixture(service: &PageService) -> Result<Fixture> {
        let a = create(service, "A", None).await?;
        let b = create(service, "B", Some(&a)).await?;
        let b = service.move_page(b.id, MovePageInput::to_root(), ACTOR).await?;
        let c = create(service, "C", Some(&a)).await?;
        let d = create(service, "D", Some(&c)).await?;
        Ok(Fixture { a, b, c, d })
    }

    #[tokio::test]
    async fn test_scenario_create_root_and_child() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;

        let a = create(&service, "A", None).await?;
        assert_eq!(a.path, MaterializedPath::root(a.id));
        assert_eq!(a.path.to_string(), format!("root.{}", PathCodec::encode(&a.id)));
        assert_eq!(a.parent_id, None);

        let b = create(&service, "B", Some(&a)).await?;
        assert_eq!(b.path.segments(), &[a.id, b.id]);
        assert_eq!(b.parent_id, Some(a.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_scenario_move_child_to_root() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;
        let b = create(&service, "B", Some(&a)).await?;

        let moved = service
            .move_page(b.id, MovePageInput::to_root(), ACTOR)
            .await?;

        assert_eq!(moved.path, MaterializedPath::root(b.id));
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.position, b.position);
        assert!(service.get_children(a.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_scenario_grandchild_path() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;

        assert_eq!(f.d.path.segments(), &[f.a.id, f.c.id, f.d.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_scenario_trash_lifecycle() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;

        // Scenario 5: soft delete cascades over A's subtree only
        let affected = service.delete_page(f.a.id, ACTOR).await?;
        assert_eq!(affected, 3);
        for page in [&f.a, &f.c, &f.d] {
            let stored = raw(&service, page.id).await?.unwrap();
            assert!(stored.is_deleted, "{} should be in the trash", page.title);
            assert!(stored.deleted_at.is_some());
        }
        assert!(!raw(&service, f.b.id).await?.unwrap().is_deleted);
        assert_eq!(ids(&service.get_all().await?), vec![f.b.id]);

        // Scenario 6: restore brings the subtree back with paths unchanged
        assert_eq!(service.restore_page(f.a.id, ACTOR).await?, 3);
        for page in [&f.a, &f.c, &f.d] {
            let stored = raw(&service, page.id).await?.unwrap();
            assert!(!stored.is_deleted);
            assert_eq!(stored.deleted_at, None);
            assert_eq!(stored.path, page.path);
            assert_eq!(stored.parent_id, page.parent_id);
        }

        // Scenario 7: permanent delete after re-deleting
        service.delete_page(f.a.id, ACTOR).await?;
        assert_eq!(service.permanent_delete_page(f.a.id).await?, 3);
        for page in [&f.a, &f.c, &f.d] {
            assert!(raw(&service, page.id).await?.is_none());
        }
        let b = service.get_by_id(f.b.id).await?;
        assert_eq!(b.path, MaterializedPath::root(f.b.id));
        assert_eq!(ids(&service.get_all().await?), vec![f.b.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_path_matches_id_for_every_visible_page() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;
        let e = create(&service, "E", Some(&f.d)).await?;
        service
            .move_page(f.c.id, MovePageInput::to_parent(f.b.id), ACTOR)
            .await?;
        create(&service, "F", Some(&e)).await?;

        let all = service.get_all().await?;
        assert_eq!(all.len(), 6);
        for page in &all {
            assert!(page.path_matches_id(), "path of {} ends in another id", page.title);
            assert_eq!(page.path.parent_id(), page.parent_id);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_orders_parents_first() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;
        create(&service, "E", Some(&f.b)).await?;

        let all = service.get_all().await?;
        let mut seen = HashSet::new();
        for page in &all {
            if let Some(parent) = page.parent_id {
                assert!(seen.contains(&parent), "{} listed before its parent", page.title);
            }
            seen.insert(page.id);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_ancestors_follow_path_prefixes() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;
        let e = create(&service, "E", Some(&f.d)).await?;

        let ancestors = service.get_ancestors(e.id).await?;
        assert_eq!(ids(&ancestors), vec![f.a.id, f.c.id, f.d.id]);
        for (depth, ancestor) in ancestors.iter().enumerate() {
            assert_eq!(ancestor.path.segments(), &e.path.segments()[..=depth]);
        }

        let root_only = service.get_ancestors(f.a.id).await?;
        assert_eq!(ids(&root_only), vec![f.a.id]);

        let crumb = service.get_breadcrumb(e.id).await?;
        assert_eq!(ids(&crumb), vec![f.a.id, f.c.id, f.d.id, e.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_rejects_cycles() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;

        for destination in [f.a.id, f.c.id, f.d.id] {
            let err = service
                .move_page(f.a.id, MovePageInput::to_parent(destination), ACTOR)
                .await
                .unwrap_err();
            assert!(matches!(err, PageServiceError::Validation(_)), "{err:?}");
        }

        // Nothing changed
        assert_eq!(service.get_by_id(f.d.id).await?.path, f.d.path);
        assert_eq!(service.get_by_id(f.a.id).await?.path, f.a.path);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_rewrites_whole_subtree() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;
        let e = create(&service, "E", Some(&f.d)).await?;

        let moved = service
            .move_page(f.c.id, MovePageInput::to_parent(f.b.id).at_position(5), ACTOR)
            .await?;
        assert_eq!(moved.path.segments(), &[f.b.id, f.c.id]);
        assert_eq!(moved.parent_id, Some(f.b.id));
        assert_eq!(moved.position, 5);
        assert_eq!(moved.updated_by.as_deref(), Some(ACTOR));

        let d = service.get_by_id(f.d.id).await?;
        let e = service.get_by_id(e.id).await?;
        assert_eq!(d.path.segments(), &[f.b.id, f.c.id, f.d.id]);
        assert_eq!(e.path.segments(), &[f.b.id, f.c.id, f.d.id, e.id]);
        assert_eq!(d.parent_id, Some(f.c.id));

        assert!(service.get_children(f.a.id).await?.is_empty());
        assert_eq!(ids(&service.get_children(f.b.id).await?), vec![f.c.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_sibling_subtree_does_not_touch_neighbours() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;

        // Sibling of C whose id shares no prefix relation with C's subtree
        let x = create(&service, "X", Some(&f.a)).await?;
        service
            .move_page(f.c.id, MovePageInput::to_root(), ACTOR)
            .await?;

        assert_eq!(service.get_by_id(x.id).await?.path, x.path);
        assert_eq!(service.get_by_id(f.a.id).await?.path, f.a.path);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_not_found_cases() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;

        let err = service
            .move_page(Uuid::new_v4(), MovePageInput::to_root(), ACTOR)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .move_page(f.b.id, MovePageInput::to_parent(Uuid::new_v4()), ACTOR)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // Deleted destination
        service.delete_page(f.c.id, ACTOR).await?;
        let err = service
            .move_page(f.b.id, MovePageInput::to_parent(f.d.id), ACTOR)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        // Deleted target
        let err = service
            .move_page(f.c.id, MovePageInput::to_root(), ACTOR)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_move_rejects_negative_position() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;

        let err = service
            .move_page(a.id, MovePageInput::to_root().at_position(-1), ACTOR)
            .await
            .unwrap_err();
        assert!(matches!(err, PageServiceError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_move_position_upper_bound_keeps_creates_working() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;

        let err = service
            .move_page(a.id, MovePageInput::to_root().at_position(i64::MAX), ACTOR)
            .await
            .unwrap_err();
        assert!(matches!(err, PageServiceError::Validation(_)));
        assert_eq!(service.get_by_id(a.id).await?.position, a.position);

        let a = service
            .move_page(a.id, MovePageInput::to_root().at_position(MAX_POSITION), ACTOR)
            .await?;
        assert_eq!(a.position, MAX_POSITION);

        let b = create(&service, "B", None).await?;
        assert_eq!(b.position, MAX_POSITION + 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_permanent_delete_counts_every_removed_row() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;
        let b = create(&service, "B", Some(&a)).await?;
        let c = create(&service, "C", Some(&b)).await?;
        let _d = create(&service, "D", Some(&c)).await?;
        let sibling = create(&service, "S", Some(&a)).await?;

        // Trash only the B branch, then purge it
        assert_eq!(service.delete_page(b.id, ACTOR).await?, 3);
        assert_eq!(service.permanent_delete_page(b.id).await?, 3);

        assert!(raw(&service, c.id).await?.is_none());
        assert_eq!(ids(&service.get_children(a.id).await?), vec![sibling.id]);
        assert!(service.list_trash().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_trash_state_predicates() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;

        // Not deleted yet: restore and purge are NotFound
        assert!(service.restore_page(a.id, ACTOR).await.unwrap_err().is_not_found());
        assert!(service.permanent_delete_page(a.id).await.unwrap_err().is_not_found());

        service.delete_page(a.id, ACTOR).await?;

        // Already deleted: delete is NotFound, reads hide it
        assert!(service.delete_page(a.id, ACTOR).await.unwrap_err().is_not_found());
        assert!(service.get_by_id(a.id).await.unwrap_err().is_not_found());

        // Unknown ids
        let ghost = Uuid::new_v4();
        assert!(service.delete_page(ghost, ACTOR).await.unwrap_err().is_not_found());
        assert!(service.restore_page(ghost, ACTOR).await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_trash_most_recent_first() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let first = create(&service, "First", None).await?;
        let second = create(&service, "Second", None).await?;
        let child = create(&service, "Child", Some(&second)).await?;

        service.delete_page(first.id, ACTOR).await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.delete_page(second.id, ACTOR).await?;

        let trash = service.list_trash().await?;
        assert_eq!(trash.len(), 3);
        assert_eq!(ids(&trash[..2]), vec![second.id, child.id]);
        assert_eq!(trash[2].id, first.id);
        assert!(trash.iter().all(|p| p.is_deleted));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_descendant_while_parent_stays_deleted() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let f = build_fixture(&service).await?;

        service.delete_page(f.a.id, ACTOR).await?;
        service.restore_page(f.c.id, ACTOR).await?;

        // C and D come back under their old path while A stays in the trash
        let c = service.get_by_id(f.c.id).await?;
        assert_eq!(c.path, f.c.path);
        assert!(raw(&service, f.a.id).await?.unwrap().is_deleted);

        let tree = service.get_tree().await?;
        let roots: HashSet<Uuid> = tree.iter().map(|n| n.page.id).collect();
        assert!(roots.contains(&f.c.id));
        assert!(roots.contains(&f.b.id));
        let c_node = tree.iter().find(|n| n.page.id == f.c.id).unwrap();
        assert_eq!(c_node.children[0].page.id, f.d.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_positions_append_to_siblings() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;
        let first = create(&service, "1", Some(&a)).await?;
        let second = create(&service, "2", Some(&a)).await?;
        let third = create(&service, "3", Some(&a)).await?;

        assert_eq!(
            (first.position, second.position, third.position),
            (0, 1, 2)
        );
        assert_eq!(
            ids(&service.get_children(a.id).await?),
            vec![first.id, second.id, third.id]
        );

        // Move the first to the end, ties fall back to creation order
        service
            .move_page(first.id, MovePageInput::to_parent(a.id).at_position(2), ACTOR)
            .await?;
        assert_eq!(
            ids(&service.get_children(a.id).await?),
            vec![second.id, first.id, third.id]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_under_deleted_parent_is_not_found() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let a = create(&service, "A", None).await?;
        service.delete_page(a.id, ACTOR).await?;

        let err = create(&service, "B", Some(&a)).await.unwrap_err();
        let err = err.downcast::<PageServiceError>()?;
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_creates_keep_paths_consistent() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let service = Arc::new(service);
        let root = create(&service, "Root", None).await?;

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            let parent = root.id;
            handles.push(tokio::spawn(async move {
                service
                    .create_page(
                        CreatePageInput::new(format!("child {i}")).with_parent(parent),
                        ACTOR,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        let children = service.get_children(root.id).await?;
        assert_eq!(children.len(), 8);
        let positions: HashSet<i64> = children.iter().map(|c| c.position).collect();
        assert_eq!(positions.len(), 8, "creates were serialized, positions are distinct");
        for child in &children {
            assert!(child.path_matches_id());
            assert!(root.path.is_proper_prefix_of(&child.path));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_opposing_moves_never_form_a_cycle() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let service = Arc::new(service);
        let x = create(&service, "X", None).await?.id;
        let y = create(&service, "Y", None).await?.id;

        let (s1, s2) = (service.clone(), service.clone());
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move {
                s1.move_page(x, MovePageInput::to_parent(y), ACTOR).await
            }),
            tokio::spawn(async move {
                s2.move_page(y, MovePageInput::to_parent(x), ACTOR).await
            }),
        );
        let outcomes = [r1?, r2?];

        // The second move re-validates against the first and is rejected
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(PageServiceError::Validation(_)))));

        let all = service.get_all().await?;
        assert_eq!(all.iter().filter(|p| p.parent_id.is_none()).count(), 1);
        for page in &all {
            assert!(page.path_matches_id());
        }
        Ok(())
    }
}
