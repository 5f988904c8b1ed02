use juno_blast::samples::{classify, FileRole, ASSEMBLY_EXTENSIONS, READ_EXTENSIONS};
use proptest::prelude::*;

fn sample_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9-]{0,15}"
}

proptest! {
    #[test]
    fn read_names_round_trip_their_sample(
        id in sample_id(),
        mate in prop_oneof![Just(("_R1", FileRole::Read1)), Just(("_R2", FileRole::Read2))],
        ext in prop::sample::select(READ_EXTENSIONS.to_vec()),
        tag in prop_oneof![Just(""), Just("_filt"), Just("_trimmed")],
    ) {
        let name = format!("{id}{}{tag}{ext}", mate.0);
        let found = classify(&name).expect("read name is recognized");
        prop_assert_eq!(found.role, mate.1);
        prop_assert_eq!(found.sample_id, id);
    }

    #[test]
    fn assembly_names_round_trip_their_sample(
        id in sample_id(),
        ext in prop::sample::select(ASSEMBLY_EXTENSIONS.to_vec()),
    ) {
        let found = classify(&format!("{id}{ext}")).expect("assembly name is recognized");
        prop_assert_eq!(found.role, FileRole::Assembly);
        prop_assert_eq!(found.sample_id, id);
    }

    #[test]
    fn unknown_extensions_are_never_classified(
        id in sample_id(),
        ext in prop_oneof![Just(".txt"), Just(".bam"), Just(".vcf"), Just(".FASTA"), Just(".fastq.bz2")],
    ) {
        let plain = format!("{id}{ext}");
        let paired = format!("{id}_R1{ext}");
        prop_assert!(classify(&plain).is_none());
        prop_assert!(classify(&paired).is_none());
    }
}
