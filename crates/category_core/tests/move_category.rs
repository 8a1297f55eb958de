use category_core::db::open_db_in_memory;
use category_core::{
    Category, CategoryRepository, CategoryService, HierarchyConfig, MemoryCategoryRepository,
    MoveError, MoveErrorKind, MoveRequest, NewCategory, SqliteCategoryRepository,
};
use uuid::Uuid;

struct Abc {
    a: Category,
    b: Category,
    c: Category,
}

/// A (root) -> B -> C
fn seed_abc<R: CategoryRepository>(service: &CategoryService<R>) -> Abc {
    let a = service.create_category(NewCategory::new("A")).unwrap();
    let b = service
        .create_category(NewCategory::new("B").under(a.id))
        .unwrap();
    let c = service
        .create_category(NewCategory::new("C").under(b.id))
        .unwrap();
    Abc { a, b, c }
}

fn memory_service() -> (MemoryCategoryRepository, CategoryService<MemoryCategoryRepository>) {
    let repo = MemoryCategoryRepository::new();
    (repo.clone(), CategoryService::new(repo))
}

fn child_names<R: CategoryRepository>(service: &CategoryService<R>, id: Uuid) -> Vec<String> {
    let mut names: Vec<_> = service
        .get_tree(id)
        .unwrap()
        .children
        .into_iter()
        .map(|child| child.name)
        .collect();
    names.sort();
    names
}

#[test]
fn moving_grandchild_under_root_flattens_tree() {
    let conn = open_db_in_memory().unwrap();
    let service = CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap());
    let Abc { a, b, c } = seed_abc(&service);

    let outcome = service.move_category(c.id, Some(a.id)).unwrap();
    assert_eq!(outcome.category.parent, Some(a.id));
    assert_eq!(outcome.previous_parent, Some(b.id));
    assert_eq!(outcome.attempts, 1);

    assert_eq!(service.get_category(c.id).unwrap().parent, Some(a.id));
    assert_eq!(child_names(&service, a.id), ["B", "C"]);
    assert!(service.get_tree(b.id).unwrap().children.is_empty());
}

#[test]
fn moving_ancestor_under_descendant_is_circular() {
    let (_, service) = memory_service();
    let Abc { a, b, c } = seed_abc(&service);

    for descendant in [&b, &c] {
        let err = service
            .move_category(a.id, Some(descendant.id))
            .unwrap_err();
        assert_eq!(err.kind(), MoveErrorKind::CircularReference);
        assert!(matches!(
            err,
            MoveError::CircularReference { subcategory, target }
                if subcategory == a.id && target == descendant.id
        ));
    }

    let err = service.move_category(b.id, Some(c.id)).unwrap_err();
    assert_eq!(err.kind(), MoveErrorKind::CircularReference);
    assert_eq!(service.get_category(a.id).unwrap().parent, None);
    assert_eq!(service.get_category(b.id).unwrap().parent, Some(a.id));
}

#[test]
fn moving_into_itself_is_rejected_everywhere() {
    let (_, service) = memory_service();
    let Abc { a, b, c } = seed_abc(&service);

    for node in [&a, &b, &c] {
        let err = service.move_category(node.id, Some(node.id)).unwrap_err();
        assert!(matches!(err, MoveError::SelfMove(id) if id == node.id));
        assert_eq!(err.kind(), MoveErrorKind::SelfMove);
    }
}

#[test]
fn missing_subcategory_or_target_is_not_found() {
    let (_, service) = memory_service();
    let Abc { a, .. } = seed_abc(&service);
    let ghost = Uuid::new_v4();

    let err = service.move_category(ghost, Some(a.id)).unwrap_err();
    assert!(matches!(err, MoveError::SubcategoryNotFound(id) if id == ghost));
    assert_eq!(err.kind(), MoveErrorKind::NotFound);

    let err = service.move_category(a.id, Some(ghost)).unwrap_err();
    assert!(matches!(err, MoveError::TargetNotFound(id) if id == ghost));
    assert_eq!(err.kind(), MoveErrorKind::NotFound);
}

#[test]
fn checks_run_in_documented_order() {
    let (_, service) = memory_service();
    let ghost = Uuid::new_v4();

    // Existence of the subcategory is checked before the self-move rule.
    let err = service.move_category(ghost, Some(ghost)).unwrap_err();
    assert!(matches!(err, MoveError::SubcategoryNotFound(_)));

    let other_ghost = Uuid::new_v4();
    let err = service.move_category(ghost, None).unwrap_err();
    assert!(matches!(err, MoveError::SubcategoryNotFound(_)));
    let err = service.move_category(ghost, Some(other_ghost)).unwrap_err();
    assert!(matches!(err, MoveError::SubcategoryNotFound(id) if id == ghost));
}

#[test]
fn moving_child_to_top_level_creates_second_root() {
    let conn = open_db_in_memory().unwrap();
    let service = CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap());
    let a = service.create_category(NewCategory::new("A")).unwrap();
    let b = service
        .create_category(NewCategory::new("B").under(a.id))
        .unwrap();

    let outcome = service.move_category(b.id, None).unwrap();
    assert_eq!(outcome.category.parent, None);
    assert_eq!(outcome.previous_parent, Some(a.id));

    let roots: Vec<_> = service
        .list_top_level_trees()
        .unwrap()
        .into_iter()
        .map(|tree| tree.id)
        .collect();
    assert_eq!(roots.len(), 2);
    assert!(roots.contains(&a.id) && roots.contains(&b.id));
}

#[test]
fn moving_root_to_top_level_is_a_successful_noop() {
    let (_, service) = memory_service();
    let a = service.create_category(NewCategory::new("A")).unwrap();

    let outcome = service.move_category(a.id, None).unwrap();
    assert_eq!(outcome.category.parent, None);
    assert_eq!(outcome.previous_parent, None);
}

#[test]
fn moving_under_unrelated_tree_or_ancestor_succeeds() {
    let (_, service) = memory_service();
    let Abc { a, b, c } = seed_abc(&service);
    let x = service.create_category(NewCategory::new("X")).unwrap();
    let y = service
        .create_category(NewCategory::new("Y").under(x.id))
        .unwrap();

    // Unrelated branch.
    service.move_category(b.id, Some(y.id)).unwrap();
    assert_eq!(service.get_category(b.id).unwrap().parent, Some(y.id));

    // Former ancestor of C, now unrelated to it.
    service.move_category(a.id, Some(c.id)).unwrap();
    assert_eq!(service.get_category(a.id).unwrap().parent, Some(c.id));

    // Direct ancestor of C.
    service.move_category(c.id, Some(x.id)).unwrap();
    assert_eq!(service.get_category(c.id).unwrap().parent, Some(x.id));
}

#[test]
fn move_changes_only_parent_and_children_follow() {
    let (repo, service) = memory_service();
    let Abc { a, b, c } = seed_abc(&service);
    let other = service.create_category(NewCategory::new("Other")).unwrap();
    let before_b = repo.get_by_id(b.id).unwrap().unwrap();
    let before_c = repo.get_by_id(c.id).unwrap().unwrap();
    let before_a = repo.get_by_id(a.id).unwrap().unwrap();

    service.move_category(b.id, Some(other.id)).unwrap();

    let after_b = repo.get_by_id(b.id).unwrap().unwrap();
    assert_eq!(after_b.id, before_b.id);
    assert_eq!(after_b.name, before_b.name);
    assert_eq!(after_b.description, before_b.description);
    assert_eq!(after_b.parent, Some(other.id));

    // Untouched rows keep their revision.
    assert_eq!(repo.get_by_id(c.id).unwrap().unwrap(), before_c);
    assert_eq!(repo.get_by_id(a.id).unwrap().unwrap(), before_a);

    let other_tree = service.get_tree(other.id).unwrap();
    assert!(other_tree.find(c.id).is_some());
    assert!(service.get_tree(a.id).unwrap().children.is_empty());
}

#[test]
fn move_request_reports_invalid_input() {
    let (_, service) = memory_service();
    let a = service.create_category(NewCategory::new("A")).unwrap();

    let missing = MoveRequest::default();
    let err = service.move_category_request(&missing).unwrap_err();
    assert_eq!(err.kind(), MoveErrorKind::InvalidInput);

    let malformed = MoveRequest {
        subcategory_id: Some("99999".to_string()),
        category_id: Some(a.id.to_string()),
    };
    let err = service.move_category_request(&malformed).unwrap_err();
    assert_eq!(err.kind(), MoveErrorKind::InvalidInput);
}

#[test]
fn move_request_runs_full_validation() {
    let (_, service) = memory_service();
    let Abc { a, b, c } = seed_abc(&service);

    let request: MoveRequest = serde_json::from_value(serde_json::json!({
        "subcategory_id": c.id.to_string(),
        "category_id": a.id.to_string(),
    }))
    .unwrap();
    service.move_category_request(&request).unwrap();
    assert_eq!(service.get_category(c.id).unwrap().parent, Some(a.id));

    let to_top: MoveRequest = serde_json::from_value(serde_json::json!({
        "subcategory_id": b.id.to_string(),
        "category_id": null,
    }))
    .unwrap();
    service.move_category_request(&to_top).unwrap();
    assert_eq!(service.get_category(b.id).unwrap().parent, None);

    let ghost: MoveRequest = serde_json::from_value(serde_json::json!({
        "subcategory_id": Uuid::new_v4().to_string(),
    }))
    .unwrap();
    assert_eq!(
        service.move_category_request(&ghost).unwrap_err().kind(),
        MoveErrorKind::NotFound
    );
}

#[test]
fn cycle_walk_respects_depth_limit() {
    let repo = MemoryCategoryRepository::new();
    let service = CategoryService::with_config(
        repo,
        HierarchyConfig {
            max_depth: 2,
            ..HierarchyConfig::default()
        },
    );
    let Abc { a, c, .. } = seed_abc(&service);
    let d = service
        .create_category(NewCategory::new("D").under(c.id))
        .unwrap();
    let outside = service.create_category(NewCategory::new("Outside")).unwrap();

    let err = service.move_category(a.id, Some(outside.id)).unwrap_err();
    assert!(matches!(err, MoveError::TooDeep { root, limit: 2 } if root == a.id));
    assert_eq!(service.get_category(a.id).unwrap().parent, None);

    // A shallow subtree is still movable under the same limit.
    service.move_category(c.id, Some(outside.id)).unwrap();
    assert_eq!(service.get_category(d.id).unwrap().parent, Some(c.id));
}

#[test]
fn move_is_rejected_when_target_depth_plus_subtree_exceeds_limit() {
    let service = CategoryService::with_config(
        MemoryCategoryRepository::new(),
        HierarchyConfig {
            max_depth: 2,
            ..HierarchyConfig::default()
        },
    );
    let a = service.create_category(NewCategory::new("A")).unwrap();
    let b = service
        .create_category(NewCategory::new("B").under(a.id))
        .unwrap();
    let x = service.create_category(NewCategory::new("X")).unwrap();
    let y = service
        .create_category(NewCategory::new("Y").under(x.id))
        .unwrap();

    // A -> B under Y would put B three levels below X.
    let err = service.move_category(a.id, Some(y.id)).unwrap_err();
    assert!(matches!(err, MoveError::TooDeep { root, limit: 2 } if root == a.id));
    assert_eq!(err.kind(), MoveErrorKind::TooDeep);
    assert_eq!(service.get_category(a.id).unwrap().parent, None);
    assert_eq!(service.list_top_level_trees().unwrap().len(), 2);

    // A leaf under Y lands exactly at the limit.
    service.move_category(b.id, Some(y.id)).unwrap();
    let trees = service.list_top_level_trees().unwrap();
    assert_eq!(trees.len(), 2);
    assert!(service.get_tree(x.id).unwrap().find(b.id).is_some());

    // Nothing may go below B any more.
    let err = service.move_category(a.id, Some(b.id)).unwrap_err();
    assert_eq!(err.kind(), MoveErrorKind::TooDeep);
}
