use std::sync::Arc;

use approx::assert_relative_eq;
use qdataset::{
    names, BundleDataSet, DDataSet, DataSetError, DataSetOps, DataSetRef, IDataSet, JoinDataSet,
    MutablePropertyDataSet, PropertyValue, QDataSet, TagGenDataSet, Units, WritableDataSet,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

fn random_table(rng: &mut StdRng, rows: usize, cols: usize) -> DDataSet {
    DDataSet::from_fn(&[rows, cols], |_| rng.gen_range(-100.0..100.0)).unwrap()
}

fn indices(values: &[i32]) -> DataSetRef {
    Arc::new(IDataSet::rank1(values.to_vec()))
}

/// 10 x 5 table with a time axis on dimension 0 and an energy axis on
/// dimension 1.
fn spectrogram() -> (DataSetRef, DataSetRef, DataSetRef) {
    let time: DataSetRef = Arc::new(TagGenDataSet::new(10, 60.0, 1000.0, Units::new("s")));
    let mut energy = DDataSet::from_fn(&[5], |idx| 2f64.powi(idx[0] as i32)).unwrap();
    energy
        .put_property(names::UNITS, Units::new("eV").into())
        .unwrap();
    let energy: DataSetRef = Arc::new(energy);
    let mut d = DDataSet::from_fn(&[10, 5], |idx| (idx[0] * 5 + idx[1]) as f64).unwrap();
    d.put_property(names::DEPEND_0, time.clone().into()).unwrap();
    d.put_property(names::DEPEND_1, energy.clone().into()).unwrap();
    d.put_property(names::UNITS, Units::new("counts").into())
        .unwrap();
    d.put_property(names::LABEL, "flux".into()).unwrap();
    (Arc::new(d), time, energy)
}

#[test]
fn test_slice_reads_the_source_row() {
    let mut rng = StdRng::seed_from_u64(7);
    let d: DataSetRef = Arc::new(random_table(&mut rng, 12, 7));
    for i in 0..12 {
        let s = d.slice(i).unwrap();
        assert_eq!(s.rank(), 1);
        for j in 0..7 {
            assert_eq!(s.value(&[j]), d.value(&[i, j]));
        }
    }
    for j in 0..7 {
        let s = d.slice1(j).unwrap();
        for i in 0..12 {
            assert_eq!(s.value(&[i]), d.value(&[i, j]));
        }
    }
}

#[test]
fn test_trim_of_trim_is_one_trim() {
    let mut rng = StdRng::seed_from_u64(11);
    let d: DataSetRef = Arc::new(random_table(&mut rng, 20, 3));
    for _ in 0..50 {
        let a = rng.gen_range(0..20);
        let b = rng.gen_range(a..=20);
        let c = rng.gen_range(0..=b - a);
        let e = rng.gen_range(c..=b - a);
        let nested = d.trim(a, b).unwrap().trim(c, e).unwrap();
        let direct = d.trim(a + c, a + e).unwrap();
        assert_eq!(nested.len(), direct.len());
        for i in 0..direct.len() {
            for j in 0..3 {
                assert_eq!(nested.value(&[i, j]), direct.value(&[i, j]));
            }
        }
    }
}

#[test]
fn test_identity_sort_changes_nothing() {
    let mut rng = StdRng::seed_from_u64(3);
    let d: DataSetRef = Arc::new(random_table(&mut rng, 9, 4));
    let identity: Vec<i32> = (0..9).collect();
    let s = d.sort(&indices(&identity)).unwrap();
    for i in 0..9 {
        for j in 0..4 {
            assert_eq!(s.value(&[i, j]), d.value(&[i, j]));
        }
    }
}

#[test]
fn test_random_sort_follows_permutation() {
    let mut rng = StdRng::seed_from_u64(5);
    let (d, time, _) = spectrogram();
    let mut perm: Vec<i32> = (0..10).collect();
    perm.shuffle(&mut rng);
    let s = d.sort(&indices(&perm)).unwrap();
    let dep = s.property(names::DEPEND_0).and_then(|v| v.into_dataset()).unwrap();
    for (i, &p) in perm.iter().enumerate() {
        assert_eq!(s.value(&[i, 2]), d.value(&[p as usize, 2]));
        assert_relative_eq!(dep.value(&[i]), time.value(&[p as usize]));
    }
    assert!(dep.property(names::CADENCE).is_none());
    assert_eq!(s.property(names::UNITS), d.property(names::UNITS));
}

#[test]
fn test_sort_rejects_out_of_range_entries() {
    let (d, _, _) = spectrogram();
    assert!(matches!(
        d.sort(&indices(&[0, 10])),
        Err(DataSetError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        d.sort(&indices(&[-1, 2])),
        Err(DataSetError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_join_adds_a_leading_dimension() {
    let mut rng = StdRng::seed_from_u64(13);
    let parts: Vec<DataSetRef> = (0..4)
        .map(|_| Arc::new(random_table(&mut rng, 3, 2)) as DataSetRef)
        .collect();
    let join: DataSetRef = Arc::new(JoinDataSet::from_datasets(parts.clone()).unwrap());
    assert_eq!(join.rank(), 3);
    assert_eq!(join.len(), 4);
    for (i, part) in parts.iter().enumerate() {
        let s = join.slice(i).unwrap();
        for a in 0..3 {
            for b in 0..2 {
                assert_eq!(s.value(&[a, b]), part.value(&[a, b]));
                assert_eq!(join.value(&[i, a, b]), part.value(&[a, b]));
            }
        }
    }
}

#[test]
fn test_join_rejects_wrong_rank() {
    let mut j = JoinDataSet::new(2).unwrap();
    let err = j.join(Arc::new(DDataSet::scalar(1.0))).unwrap_err();
    assert!(matches!(err, DataSetError::RankMismatch { .. }));
}

#[test]
fn test_bundle_recovers_series_and_their_properties() {
    let mut a = DDataSet::rank1(vec![1.0, 2.0, 3.0]);
    a.put_property(names::UNITS, Units::new("nT").into()).unwrap();
    a.put_property(names::LABEL, "Bx".into()).unwrap();
    let mut b = DDataSet::rank1(vec![4.0, 5.0, 6.0]);
    b.put_property(names::UNITS, Units::new("cm^-3").into())
        .unwrap();
    let series: Vec<DataSetRef> = vec![Arc::new(a), Arc::new(b)];
    let bundle: DataSetRef = Arc::new(BundleDataSet::from_series(series.clone()).unwrap());
    assert_eq!(bundle.rank(), 2);

    let desc = bundle
        .property(names::BUNDLE_1)
        .and_then(|v| v.into_dataset())
        .unwrap();
    for (i, s) in series.iter().enumerate() {
        let column = bundle.unbundle(i).unwrap();
        for k in 0..3 {
            assert_eq!(column.value(&[k]), s.value(&[k]));
        }
        assert_eq!(desc.property_at(names::UNITS, i), s.property(names::UNITS));
        assert_eq!(column.property(names::UNITS), s.property(names::UNITS));
    }
    assert_eq!(
        desc.property_at(names::LABEL, 0),
        Some(PropertyValue::from("Bx"))
    );
    assert_eq!(desc.property_at(names::LABEL, 1), None);
}

#[test]
fn test_bundle_rejects_unequal_lengths() {
    let mut b = BundleDataSet::new();
    b.bundle(Arc::new(DDataSet::rank1(vec![1.0, 2.0]))).unwrap();
    let err = b
        .bundle(Arc::new(DDataSet::rank1(vec![1.0, 2.0, 3.0])))
        .unwrap_err();
    assert!(matches!(err, DataSetError::InvalidConstruction(_)));
}

#[test]
fn test_views_inherit_plain_properties_and_derive_axes() {
    let (d, _, energy) = spectrogram();
    let t = d.trim(2, 6).unwrap();
    assert_eq!(t.property(names::UNITS), d.property(names::UNITS));
    assert_eq!(t.property(names::LABEL), d.property(names::LABEL));
    assert_eq!(
        t.property(names::DEPEND_1),
        Some(PropertyValue::from(energy))
    );
    let dep0 = t.property(names::DEPEND_0).and_then(|v| v.into_dataset()).unwrap();
    assert_eq!(dep0.len(), 4);
    assert_eq!(dep0.value(&[0]), 1120.0);
    assert_ne!(t.property(names::DEPEND_0), d.property(names::DEPEND_0));
}

#[test]
fn test_sealed_dataset_rejects_writes() {
    let mut d = DDataSet::rank1(vec![1.0, 2.0]);
    d.put_property(names::LABEL, "before".into()).unwrap();
    d.make_immutable();
    assert!(matches!(
        d.put_value(&[0], 9.0),
        Err(DataSetError::Immutable(_))
    ));
    assert!(matches!(
        d.put_property(names::LABEL, "after".into()),
        Err(DataSetError::Immutable(_))
    ));
    assert_eq!(d.value(&[0]), 1.0);
    assert_eq!(d.property(names::LABEL), Some("before".into()));
}

#[test]
fn test_slice_of_spectrogram_row() {
    let (d, time, energy) = spectrogram();
    let s = d.slice(3).unwrap();
    assert_eq!(s.rank(), 1);
    assert_eq!(s.len(), 5);
    let ctx = s.property(names::CONTEXT_0).and_then(|v| v.into_dataset()).unwrap();
    assert_eq!(ctx.rank(), 0);
    assert_relative_eq!(ctx.value(&[]), time.value(&[3]));
    assert_eq!(ctx.property(names::UNITS), time.property(names::UNITS));
    assert_eq!(s.property(names::DEPEND_0), Some(PropertyValue::from(energy)));
    assert!(s.property(names::DEPEND_1).is_none());
}

#[test]
fn test_trim_of_spectrogram_rows() {
    let (d, _, _) = spectrogram();
    let t = d.trim(2, 6).unwrap();
    assert_eq!(t.rank(), 2);
    assert_eq!(t.len(), 4);
    assert_eq!(t.length(&[0]), 5);
    for j in 0..5 {
        assert_eq!(t.value(&[0, j]), d.value(&[2, j]));
    }
}
