use proptest::prelude::*;
use serde_json::{json, Map, Value};
use spine_fingerprint::{
    make_capsule_manifest_hash, make_evidence_id, make_negative_evidence_id, ManifestVersion,
};

proptest! {
    #[test]
    fn evidence_ids_are_pure_and_channel_distinct(
        sid in "[a-z0-9-]{1,16}",
        cid in "[a-z0-9-]{1,16}",
        eid in "[a-z0-9-]{1,16}",
        qid in "[a-z0-9.]{1,16}",
    ) {
        let a = make_evidence_id(&sid, &cid, &eid, &qid);
        let b = make_evidence_id(&sid, &cid, &eid, &qid);
        let n = make_negative_evidence_id(&sid, &cid, &eid, &qid);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(n.clone(), make_negative_evidence_id(&sid, &cid, &eid, &qid));
        prop_assert_ne!(&a[3..], &n[4..]);
    }

    #[test]
    fn manifest_hash_ignores_extra_keys(
        extra in prop::collection::btree_map("x_[a-z]{1,8}", "[a-z0-9]{0,12}", 0..6),
        evidence in prop::collection::vec("ev-[a-f0-9]{8}", 1..5),
    ) {
        let mut manifest = Map::new();
        manifest.insert("session_id".into(), json!("s1"));
        manifest.insert("query_hash".into(), json!("qh"));
        manifest.insert("evidence_ids".into(), json!(evidence));
        manifest.insert("mutation_ids".into(), json!(["mut-1"]));
        let version = ManifestVersion::detect(&manifest);
        let clean = make_capsule_manifest_hash("run-x", &manifest, version);

        for (k, v) in extra {
            manifest.insert(k, Value::String(v));
        }
        prop_assert_eq!(ManifestVersion::detect(&manifest), version);
        prop_assert_eq!(clean, make_capsule_manifest_hash("run-x", &manifest, version));
    }
}
