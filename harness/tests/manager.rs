use commonware_codec::{DecodeExt as _, Encode as _, ReadExt as _};
use commonware_macros::test_traced;
use mgmt_dispatcher::{accept_all, CommandContinuation};
use mgmt_harness::{
    check_outcome, make_response, CheckResponseResult, CommandFailure, CommandSuccess, Error,
    Fixture,
};
use mgmt_packet::{
    content_type, ControlParameters, ControlResponse, Interest, Name, PrefixAnnouncement,
};
use mgmt_security::{CommandSignature, SignedInterestFormat};
use std::time::Duration;
use test_case::test_case;

fn name(uri: &str) -> Name {
    uri.parse().unwrap()
}

fn echo(_: &Name, _: &Interest, parameters: &ControlParameters, done: CommandContinuation) {
    done(make_response(200, "OK", parameters));
}

/// A fixture serving `fib/add-nexthop` (echo, open to all), `faces/update` (echo, requires the
/// "faces" privilege), `rib/announce` and the `faces/list` dataset.
fn fixture() -> Fixture {
    let fixture = Fixture::default();
    let dispatcher = fixture.dispatcher();
    dispatcher
        .add_control_command(name("/fib/add-nexthop"), accept_all(), |_| true, echo)
        .unwrap();
    dispatcher
        .add_control_command(
            name("/faces/update"),
            fixture.authorization("faces"),
            |_| true,
            echo,
        )
        .unwrap();
    dispatcher
        .add_announcement_command(
            name("/rib/announce"),
            fixture.authorization("rib"),
            |_, _, announcement, done| {
                let parameters = ControlParameters::new()
                    .with_name(announcement.announced_name().clone())
                    .with_expiration_period(announcement.expiration_millis());
                done(make_response(200, "OK", &parameters));
            },
        )
        .unwrap();
    dispatcher
        .add_status_dataset(name("/faces/list"), accept_all(), |_, _, context| {
            context.append(&ControlResponse::new(200, "OK"));
        })
        .unwrap();
    fixture.set_top_prefix().unwrap();
    fixture
}

fn add_nexthop() -> ControlParameters {
    ControlParameters::new().with_face_id(10).with_cost(0)
}

#[test_traced]
fn test_v02_command_echo() {
    let mut fixture = fixture();
    let parameters = add_nexthop();
    let identity = fixture.config().identity.clone();
    let request = fixture
        .make_control_command_request_with(
            name("/localhost/nfd/fib/add-nexthop"),
            &parameters,
            SignedInterestFormat::V02,
            &identity,
        )
        .unwrap();
    assert_eq!(
        CommandSignature::parse(request.name()).unwrap().format(),
        SignedInterestFormat::V02
    );
    fixture.receive_interest(&request);

    let expected = make_response(200, "OK", &parameters);
    assert_eq!(
        fixture.check_response(0, request.name(), &expected, Some(content_type::BLOB)),
        CheckResponseResult::Ok
    );
}

#[test]
fn test_out_of_boundary() {
    let mut fixture = fixture();
    let parameters = add_nexthop();
    let expected = make_response(200, "OK", &parameters);
    let mut names = Vec::new();
    for _ in 0..2 {
        let request = fixture
            .make_control_command_request(name("/localhost/nfd/fib/add-nexthop"), &parameters)
            .unwrap();
        fixture.receive_interest(&request);
        names.push(request.name().clone());
    }
    assert_ne!(names[0], names[1]);
    assert_eq!(fixture.responses().len(), 2);
    for (idx, name) in names.iter().enumerate() {
        assert_eq!(
            fixture.check_response(idx, name, &expected, None),
            CheckResponseResult::Ok
        );
    }
    assert_eq!(
        fixture.check_response(2, &names[0], &expected, None),
        CheckResponseResult::OutOfBoundary
    );
}

#[test]
fn test_wrong_name() {
    let fixture = fixture();
    let request = Interest::new(name("/localhost/nfd/faces/list"));
    fixture.receive_interest(&request);

    // The dataset reply carries a version and segment after the request name
    let expected = ControlResponse::new(200, "OK");
    assert_eq!(
        fixture.check_response(0, request.name(), &expected, None),
        CheckResponseResult::WrongName
    );
    let actual = fixture.responses()[0].name().clone();
    assert_eq!(actual.len(), request.name().len() + 2);
    assert_eq!(
        fixture.check_response(0, &actual, &expected, Some(content_type::BLOB)),
        CheckResponseResult::Ok
    );
}

#[test]
fn test_concatenate_responses() {
    let mut fixture = fixture();
    for face_id in 1..=4 {
        let parameters = ControlParameters::new().with_face_id(face_id).with_cost(0);
        let request = fixture
            .make_control_command_request(name("/localhost/nfd/fib/add-nexthop"), &parameters)
            .unwrap();
        fixture.receive_interest(&request);
    }
    let contents: Vec<Vec<u8>> = fixture
        .responses()
        .iter()
        .map(|data| data.content().to_vec())
        .collect();
    assert_eq!(contents.len(), 4);

    let middle = fixture.concatenate_responses(1, 2).unwrap();
    assert_eq!(&middle[..], [contents[1].clone(), contents[2].clone()].concat());
    let all = fixture.concatenate_responses(0, 0).unwrap();
    assert_eq!(&all[..], contents.concat());
    let clamped = fixture.concatenate_responses(3, 5).unwrap();
    assert_eq!(&clamped[..], &contents[3][..]);
    assert!(matches!(
        fixture.concatenate_responses(5, 0),
        Err(Error::OutOfRange { start: 5, len: 4 })
    ));
}

#[test_traced]
fn test_privilege_granted() {
    let mut fixture = fixture();
    fixture.set_privilege("faces");
    let parameters = add_nexthop();
    let request = fixture
        .make_control_command_request(name("/localhost/nfd/faces/update"), &parameters)
        .unwrap();
    fixture.receive_interest(&request);
    assert_eq!(
        check_outcome::<CommandSuccess>(&fixture.responses(), 0, request.name()),
        CheckResponseResult::Ok
    );
}

#[test]
fn test_privilege_missing() {
    let mut fixture = fixture();
    fixture.set_privilege("rib");
    let request = fixture
        .make_control_command_request(name("/localhost/nfd/faces/update"), &add_nexthop())
        .unwrap();
    fixture.receive_interest(&request);
    assert_eq!(
        check_outcome::<CommandFailure<403>>(&fixture.responses(), 0, request.name()),
        CheckResponseResult::Ok
    );
    assert_eq!(
        fixture.check_response(
            0,
            request.name(),
            &ControlResponse::new(403, "authorization rejected"),
            None
        ),
        CheckResponseResult::Ok
    );
}

#[test]
fn test_privilege_other_identity() {
    let mut fixture = fixture();
    fixture.set_privilege("faces");
    let intruder = name("/intruder");
    fixture
        .builder()
        .keychain_mut()
        .create_identity(intruder.clone());
    let request = fixture
        .make_control_command_request_with(
            name("/localhost/nfd/faces/update"),
            &add_nexthop(),
            SignedInterestFormat::V03,
            &intruder,
        )
        .unwrap();
    fixture.receive_interest(&request);
    assert_eq!(
        fixture.check_response(0, request.name(), &ControlResponse::new(403, ""), None),
        CheckResponseResult::WrongText
    );
}

#[test]
fn test_unsigned_command_dropped() {
    let fixture = fixture();
    let request = Interest::new(
        name("/localhost/nfd/faces/update").append_generic(add_nexthop().encode().freeze()),
    );
    fixture.receive_interest(&request);
    assert!(fixture.responses().is_empty());
}

#[test]
fn test_wrong_code_precedes_text_and_body() {
    let mut fixture = fixture();
    let request = fixture
        .make_control_command_request(name("/localhost/nfd/fib/add-nexthop"), &add_nexthop())
        .unwrap();
    fixture.receive_interest(&request);
    let expected = make_response(
        400,
        "failed in validating parameters",
        &ControlParameters::new().with_face_id(99),
    );
    assert_eq!(
        fixture.check_response(0, request.name(), &expected, Some(content_type::BLOB)),
        CheckResponseResult::WrongCode
    );
    assert_eq!(
        fixture.check_response(0, request.name(), &expected, Some(content_type::NACK)),
        CheckResponseResult::WrongContentType
    );
}

#[test_traced]
fn test_announcement_forced_to_v03() {
    let mut fixture = fixture();
    fixture.set_privilege("rib");
    let identity = fixture.config().identity.clone();
    let announcement = fixture
        .builder()
        .keychain()
        .sign_announcement(
            &PrefixAnnouncement::new(name("/app"), 3_600_000),
            &identity,
            1,
        )
        .unwrap();
    let request = fixture
        .builder()
        .build(
            name("/localhost/nfd/rib/announce"),
            mgmt_harness::Payload::Announcement(&announcement),
            SignedInterestFormat::V02,
            &identity,
        )
        .unwrap();
    assert_eq!(
        CommandSignature::parse(request.name()).unwrap().format(),
        SignedInterestFormat::V03
    );

    fixture.receive_interest(&request);
    let parameters = ControlParameters::new()
        .with_name(name("/app"))
        .with_expiration_period(3_600_000);
    assert_eq!(
        fixture.check_response(
            0,
            request.name(),
            &make_response(200, "OK", &parameters),
            None
        ),
        CheckResponseResult::Ok
    );
}

#[test]
fn test_nothing_captured_before_advance() {
    let mut fixture = fixture();
    let request = fixture
        .make_control_command_request(name("/localhost/nfd/fib/add-nexthop"), &add_nexthop())
        .unwrap();
    fixture.face().receive(request.clone());
    assert!(fixture.responses().is_empty());
    fixture.advance_clocks(Duration::from_millis(1), 1);
    assert_eq!(fixture.responses().len(), 1);
}

#[test]
fn test_handler_completing_later() {
    let fixture = Fixture::default();
    let pending = std::rc::Rc::new(std::cell::RefCell::new(Vec::<CommandContinuation>::new()));
    fixture
        .dispatcher()
        .add_control_command(name("/faces/destroy"), accept_all(), |_| true, {
            let pending = pending.clone();
            move |_, _, _, done| pending.borrow_mut().push(done)
        })
        .unwrap();
    fixture.set_top_prefix().unwrap();

    let mut fixture = fixture;
    let request = fixture
        .make_control_command_request(name("/localhost/nfd/faces/destroy"), &add_nexthop())
        .unwrap();
    fixture.receive_interest(&request);
    assert!(fixture.responses().is_empty());

    let done = pending.borrow_mut().pop().unwrap();
    done(ControlResponse::new(200, "OK"));
    fixture.advance_clocks(Duration::from_millis(1), 1);
    assert_eq!(
        fixture.check_response(0, request.name(), &ControlResponse::new(200, "OK"), None),
        CheckResponseResult::Ok
    );
}

#[test]
fn test_segmented_dataset() {
    let fixture = Fixture::new(mgmt_harness::Config {
        dispatcher: mgmt_dispatcher::Config {
            segment_size: 16,
            ..Default::default()
        },
        ..Default::default()
    });
    let entries: Vec<ControlParameters> = (0..10)
        .map(|i| {
            ControlParameters::new()
                .with_face_id(i)
                .with_uri(format!("udp4://10.0.0.{i}:6363"))
        })
        .collect();
    let dataset = entries.clone();
    fixture
        .dispatcher()
        .add_status_dataset(name("/faces/list"), accept_all(), move |_, _, context| {
            for entry in &dataset {
                context.append(entry);
            }
        })
        .unwrap();
    fixture.set_top_prefix().unwrap();
    fixture.receive_interest(&Interest::new(name("/localhost/nfd/faces/list")));

    let responses = fixture.responses().len();
    assert!(responses > 1);
    let content = fixture.concatenate_responses(0, 0).unwrap();
    let mut buf = content;
    let mut decoded = Vec::new();
    while !buf.is_empty() {
        decoded.push(ControlParameters::read(&mut buf).unwrap());
    }
    assert_eq!(decoded, entries);
    let last = fixture.responses()[responses - 1].clone();
    assert_eq!(
        last.final_block_id(),
        last.name().last()
    );
}

#[test_case(ControlParameters::new().with_face_id(10).with_cost(0); "face and cost")]
#[test_case(ControlParameters::new().with_name("/net/example".parse().unwrap()); "name")]
#[test_case(ControlParameters::new().with_uri("tcp4://192.0.2.1:6363"); "uri")]
#[test_case(
    ControlParameters::new()
        .with_name("/a/b".parse().unwrap())
        .with_face_id(300)
        .with_cost(65536)
        .with_uri("udp4://198.51.100.7:6363");
    "all"
)]
fn test_parameters_survive_dispatch(parameters: ControlParameters) {
    let mut fixture = fixture();
    let request = fixture
        .make_control_command_request(name("/localhost/nfd/fib/add-nexthop"), &parameters)
        .unwrap();
    fixture.receive_interest(&request);
    let response =
        ControlResponse::decode(fixture.responses()[0].content().clone()).unwrap();
    assert_eq!(
        ControlParameters::decode(response.body_bytes()).unwrap(),
        parameters
    );
}
