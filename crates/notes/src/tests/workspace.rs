//! Opening on-disk workspaces.

#[cfg(test)]
mod tests {
    use crate::config::{save_config, NotesConfig};
    use crate::tests::support::owner;
    use crate::vector_index::OwnerFilter;
    use crate::{IndexMode, NotesWorkspace};
    use recall_core::AppError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_notes_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let u1 = owner("u1");

        let created = {
            let workspace = NotesWorkspace::open(temp.path(), IndexMode::Open).unwrap();
            workspace.service().create(&u1, "spare key is under the blue pot").await.unwrap()
        };
        assert!(!created.index.is_degraded());

        let workspace = NotesWorkspace::open(temp.path(), IndexMode::Open).unwrap();
        let note = workspace.service().get(&u1, &created.note.id).await.unwrap();
        assert_eq!(note, created.note);
        assert_eq!(workspace.index.count(&OwnerFilter::new(&u1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_model_change_requires_rebuild() {
        let temp = TempDir::new().unwrap();
        let u1 = owner("u1");

        {
            let workspace = NotesWorkspace::open(temp.path(), IndexMode::Open).unwrap();
            workspace.service().create(&u1, "spare key is under the blue pot").await.unwrap();
        }

        let mut config = NotesConfig::default();
        config.embedding.dimensions = 128;
        save_config(temp.path(), &config).unwrap();

        let err = NotesWorkspace::open(temp.path(), IndexMode::Open).err().unwrap();
        assert!(matches!(err, AppError::Index(_)));
        assert!(err.to_string().contains("--rebuild"));

        let workspace = NotesWorkspace::open(temp.path(), IndexMode::Rebuild).unwrap();
        assert_eq!(workspace.index.count(&OwnerFilter::new(&u1)).await.unwrap(), 0);

        let report = workspace.service().resync(&u1).await.unwrap();
        assert_eq!(report.notes, 1);
        assert_eq!(report.indexed, 1);
        assert_eq!(workspace.index.count(&OwnerFilter::new(&u1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_reindexes_every_owner() {
        let temp = TempDir::new().unwrap();
        let (u1, u2) = (owner("u1"), owner("u2"));

        {
            let workspace = NotesWorkspace::open(temp.path(), IndexMode::Open).unwrap();
            let service = workspace.service();
            service.create(&u1, "spare key is under the blue pot").await.unwrap();
            service.create(&u2, "bike lock combination is 0420").await.unwrap();
            service.create(&u2, "dog's vet is Dr. Alvarez").await.unwrap();
        }

        let workspace = NotesWorkspace::open(temp.path(), IndexMode::Rebuild).unwrap();
        let report = workspace.service().resync_all().await.unwrap();
        assert_eq!(report.owners, 2);
        assert_eq!(report.notes, 3);
        assert_eq!(report.indexed, 3);

        let stats = workspace.service().stats(&u2).await.unwrap();
        assert_eq!(stats.notes, 2);
        assert_eq!(stats.indexed_vectors, 2);
        assert_eq!(stats.unindexed_notes, 0);
        assert_eq!(workspace.index.count(&OwnerFilter::new(&u1)).await.unwrap(), 1);
    }
}
