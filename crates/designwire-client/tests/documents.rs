mod common;

use designwire_client::{
    ClientMethod, DocumentHandle, DocumentState, ProblemsHolder, RequiredAssetsInfo, UnitHandle,
    UnitInfo, WorkspaceHandle,
};

use common::{document, methods, session, split, ScriptedHost};

#[test]
fn open_document_fills_only_the_needed_pools() {
    let (mut client, memory) = session();
    let before = memory.flushed().len();
    let mut host = ScriptedHost::default();
    let doc = document(1, 1);
    host.payloads.insert(doc.handle, vec![1, 2, 3]);
    host.assets.insert(
        doc.handle,
        RequiredAssetsInfo {
            image_count: 2,
            swf_count: 0,
        },
    );

    let mut problems = ProblemsHolder::new();
    let mut required = RequiredAssetsInfo::default();
    let opened = client
        .open_document_with(&mut host, &doc, true, &mut problems, &mut required)
        .expect("open should not fault");

    assert!(opened);
    assert!(problems.is_empty());
    assert!(host.reported.is_empty());
    assert_eq!(required.image_count, 2);

    let journal = client.take_journal();
    assert_eq!(
        methods(&journal),
        vec![
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::FillImageClassPool,
            ClientMethod::OpenDocument,
        ]
    );
    let flushed = memory.flushed();
    let messages = split(&flushed[before..], &journal);
    assert!(messages[0].starts_with(&[0, 4, 0, 0, 0, 0]));
    assert!(messages[0].ends_with(&[0, 0, 1, 2, 3]));
    assert_eq!(messages[1], &[0, 11, 0, 0, 0, 2, 0xAB, 0xAB]);
    assert_eq!(messages[2], &[0, 6, 0, 0, 0, 0, 1]);
    assert_eq!(client.document_state(&doc), DocumentState::Opened);
}

#[test]
fn register_message_carries_file_and_class_name() {
    let (mut client, memory) = session();
    let before = memory.flushed().len();
    let mut host = ScriptedHost::default();
    let doc = document(5, 1);

    assert!(client.open_document(&mut host, &doc).expect("open should not fault"));

    let journal = client.take_journal();
    let flushed = memory.flushed();
    let messages = split(&flushed[before..], &journal);
    let mut reader = designwire_frame::AmfReader::new(messages[0].to_vec());
    assert_eq!(reader.read_byte().unwrap(), 0);
    assert_eq!(reader.read_byte().unwrap(), 4);
    assert_eq!(reader.read_short().unwrap(), 0);
    assert_eq!(reader.read_short().unwrap(), 0);
    assert_eq!(reader.read_utf().unwrap(), "file:///src/Doc5.mxml");
    assert_eq!(reader.read_utf().unwrap(), "Doc5.mxml");
    assert_eq!(reader.read_utf().unwrap(), "views.Doc5");
    assert_eq!(reader.read_short().unwrap(), 0);
    assert!(reader.is_empty());
    assert_eq!(messages[1], &[0, 6, 0, 0, 0, 0, 0]);
}

#[test]
fn failing_writer_leaves_buffer_untouched() {
    let (mut client, memory) = session();
    client
        .qualify_external_inline_style_source()
        .expect("qualify should succeed");
    client.take_journal();
    let pending = client.pending().to_vec();
    let flushed = memory.flushed();

    let mut host = ScriptedHost::default();
    let doc = document(1, 1);
    host.failing.insert(doc.handle);

    let mut problems = ProblemsHolder::new();
    let opened = client
        .open_document_with(
            &mut host,
            &doc,
            false,
            &mut problems,
            &mut RequiredAssetsInfo::default(),
        )
        .expect("content problems are not faults");

    assert!(!opened);
    assert_eq!(client.pending(), pending.as_slice());
    assert_eq!(memory.flushed(), flushed);
    assert!(client.journal().is_empty());
    assert_eq!(problems.len(), 1);
    assert_eq!(problems.iter().next().unwrap().source, Some(doc.file.clone()));
    assert_eq!(host.reported.len(), 1);
    assert_eq!(client.document_state(&doc), DocumentState::Allocated);
}

#[test]
fn strings_of_a_failed_factory_are_sent_on_their_own() {
    let (mut client, memory) = session();
    let mut host = ScriptedHost::default();
    let failing = document(1, 1);
    host.failing.insert(failing.handle);
    host.strings.insert(failing.handle, vec!["label".into()]);

    assert!(!client.open_document(&mut host, &failing).unwrap());
    let journal = client.take_journal();
    assert_eq!(methods(&journal), vec![ClientMethod::UpdateStringRegistry]);
    assert_eq!(
        client.pending(),
        &[0, 10, 0, 1, 0, 0, 0x0B, b'l', b'a', b'b', b'e', b'l']
    );

    // A later factory reuses the id without sending the string again.
    let next = document(2, 1);
    host.strings.insert(next.handle, vec!["label".into()]);
    assert!(client.open_document(&mut host, &next).unwrap());
    assert_eq!(client.take_journal().len(), 2);
    let flushed = memory.flushed();
    assert_eq!(flushed.windows(5).filter(|w| *w == b"label").count(), 1);
    assert_eq!(client.strings().len(), 1);
}

#[test]
fn referenced_factories_are_committed_first() {
    let (mut client, memory) = session();
    let before = memory.flushed().len();
    let mut host = ScriptedHost::default();
    let main = document(1, 1);
    let button = document(2, 1);
    host.references.insert(main.handle, vec![button.clone()]);
    host.strings.insert(main.handle, vec!["x".into()]);
    host.strings.insert(button.handle, vec!["x".into(), "y".into()]);

    assert!(client.open_document(&mut host, &main).unwrap());

    assert_eq!(host.written, vec![main.handle, button.handle]);
    let journal = client.take_journal();
    assert_eq!(
        methods(&journal),
        vec![
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::OpenDocument,
        ]
    );
    let flushed = memory.flushed();
    let messages = split(&flushed[before..], &journal);

    // The dependency goes first and defines every string of the batch.
    assert!(messages[0].starts_with(&[0, 4, 0, 0, 0, 1]));
    assert!(messages[0].ends_with(&[0, 2, 0, 0, 0x03, b'x', 0, 1, 0x03, b'y', 0, 0, 0, 1]));
    assert!(messages[1].starts_with(&[0, 4, 0, 0, 0, 0]));
    assert!(messages[1].ends_with(&[0, 0, 0, 0]));
    assert_eq!(messages[2], &[0, 6, 0, 0, 0, 0, 0]);
    assert_eq!(client.document_state(&button), DocumentState::Registered);
}

#[test]
fn reference_cycles_register_each_document_once() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let a = document(1, 1);
    let b = document(2, 1);
    host.references.insert(a.handle, vec![b.clone()]);
    host.references.insert(b.handle, vec![a.clone(), b.clone()]);

    assert!(client.open_document(&mut host, &a).unwrap());

    assert_eq!(host.written, vec![a.handle, b.handle]);
    assert_eq!(
        methods(client.journal()),
        vec![
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::OpenDocument,
        ]
    );
    assert_eq!(client.document_state(&a), DocumentState::Opened);
    assert_eq!(client.document_state(&b), DocumentState::Registered);
}

#[test]
fn failing_reference_abandons_the_batch() {
    let (mut client, _memory) = session();
    let pending = client.pending().to_vec();
    let mut host = ScriptedHost::default();
    let main = document(1, 1);
    let broken = document(2, 1);
    host.references.insert(main.handle, vec![broken.clone()]);
    host.failing.insert(broken.handle);

    let mut problems = ProblemsHolder::new();
    let opened = client
        .open_document_with(
            &mut host,
            &main,
            false,
            &mut problems,
            &mut RequiredAssetsInfo::default(),
        )
        .unwrap();

    assert!(!opened);
    assert!(client.journal().is_empty());
    assert_eq!(client.pending(), pending.as_slice());
    assert_eq!(problems.len(), 1);
    assert_eq!(problems.iter().next().unwrap().source, Some(broken.file.clone()));
    assert_eq!(client.document_state(&main), DocumentState::Allocated);
}

#[test]
fn reference_into_unregistered_unit_registers_that_unit() {
    let (mut client, memory) = session();
    let before = memory.flushed().len();
    let mut host = ScriptedHost::default();
    host.known_units.insert(
        UnitHandle(2),
        UnitInfo::new(UnitHandle(2), WorkspaceHandle(1)),
    );
    let main = document(1, 1);
    let shared = document(2, 2);
    host.references.insert(main.handle, vec![shared.clone()]);

    assert!(client.open_document(&mut host, &main).unwrap());

    assert_eq!(host.initialized, vec![UnitHandle(2)]);
    let journal = client.take_journal();
    assert_eq!(
        methods(&journal),
        vec![
            ClientMethod::RegisterUnit,
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::OpenDocument,
        ]
    );
    let flushed = memory.flushed();
    let messages = split(&flushed[before..], &journal);
    // The referenced factory is addressed through its own unit.
    assert!(messages[1].starts_with(&[0, 4, 0, 1, 0, 1]));
    assert!(messages[2].starts_with(&[0, 4, 0, 0, 0, 0]));
}

#[test]
fn reference_into_unknown_unit_is_a_problem() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let main = document(1, 1);
    let orphan = document(2, 9);
    host.references.insert(main.handle, vec![orphan]);

    let mut problems = ProblemsHolder::new();
    let opened = client
        .open_document_with(
            &mut host,
            &main,
            false,
            &mut problems,
            &mut RequiredAssetsInfo::default(),
        )
        .unwrap();

    assert!(!opened);
    assert_eq!(host.initialized, vec![UnitHandle(9)]);
    assert_eq!(problems.len(), 2);
    assert!(client.journal().is_empty());
}

#[test]
fn unsaved_registered_document_is_updated_in_place() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let doc = document(1, 1);
    host.payloads.insert(doc.handle, vec![7]);
    assert!(client.open_document(&mut host, &doc).unwrap());
    client.take_journal();

    host.unsaved.insert(doc.handle);
    assert!(client.open_document(&mut host, &doc).unwrap());

    assert_eq!(
        methods(client.journal()),
        vec![ClientMethod::UpdateDocumentFactory]
    );
    assert_eq!(
        client.pending(),
        &[0, 5, 0, 0, 0, 0, 0, 0, 7, 0, 7, 0, 0, 0, 0]
    );
    assert_eq!(client.document_state(&doc), DocumentState::Opened);
}

#[test]
fn update_of_unknown_document_is_a_problem() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let doc = document(1, 1);

    assert!(!client.update_document_factory(&mut host, &doc).unwrap());
    assert_eq!(host.reported.len(), 1);
    assert!(client.pending().is_empty());
}

#[test]
fn update_after_failed_registration_is_a_problem() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let doc = document(5, 1);
    host.failing.insert(doc.handle);

    assert!(!client.open_document(&mut host, &doc).unwrap());
    assert_eq!(client.document_state(&doc), DocumentState::Allocated);
    client.take_journal();
    host.reported.clear();

    host.failing.clear();
    let updated = client.update_document_factory(&mut host, &doc).unwrap();

    assert!(!updated);
    assert!(methods(client.journal()).is_empty());
    assert!(client.pending().is_empty());
    assert_eq!(host.reported.len(), 1);
    assert_eq!(client.document_state(&doc), DocumentState::Allocated);
}

#[test]
fn generator_failure_is_recorded_and_open_continues() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost {
        failing_generator: true,
        ..ScriptedHost::default()
    };
    let doc = document(1, 1);
    host.assets.insert(
        doc.handle,
        RequiredAssetsInfo {
            image_count: 1,
            swf_count: 1,
        },
    );

    let mut problems = ProblemsHolder::new();
    let opened = client
        .open_document_with(
            &mut host,
            &doc,
            false,
            &mut problems,
            &mut RequiredAssetsInfo::default(),
        )
        .unwrap();

    assert!(opened);
    assert_eq!(
        methods(client.journal()),
        vec![
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::OpenDocument,
        ]
    );
    assert_eq!(problems.len(), 2);
    assert_eq!(host.reported.len(), 1);
    assert_eq!(host.reported[0].1.len(), 2);
}

#[test]
fn swf_pool_alone() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let doc = document(1, 1);
    host.assets.insert(
        doc.handle,
        RequiredAssetsInfo {
            image_count: 0,
            swf_count: 3,
        },
    );

    assert!(client.open_document(&mut host, &doc).unwrap());
    assert_eq!(
        methods(client.journal()),
        vec![
            ClientMethod::RegisterDocumentFactory,
            ClientMethod::FillSwfClassPool,
            ClientMethod::OpenDocument,
        ]
    );
}

#[test]
fn document_references_are_force_registered() {
    let (mut client, _memory) = session();
    let mut host = ScriptedHost::default();
    let first = document(1, 1);
    let second = document(2, 1);
    let mut problems = ProblemsHolder::new();
    let mut required = RequiredAssetsInfo::default();

    assert!(client
        .register_document_references(
            &mut host,
            &[first.clone(), second.clone()],
            UnitHandle(1),
            &mut problems,
            &mut required,
        )
        .unwrap());
    assert!(client
        .register_document_references(&mut host, &[first.clone()], UnitHandle(1), &mut problems, &mut required)
        .unwrap());
    assert_eq!(host.written, vec![first.handle, second.handle, first.handle]);

    host.failing.insert(DocumentHandle(3));
    assert!(!client
        .register_document_references(
            &mut host,
            &[document(3, 1), second],
            UnitHandle(1),
            &mut problems,
            &mut required,
        )
        .unwrap());
    assert_eq!(client.journal().len(), 3);
}
