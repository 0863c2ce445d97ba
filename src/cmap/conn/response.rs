use crate::{
    bson::{Bson, Document},
    bson_util,
    error::{CommandError, Error, ErrorKind, Result},
};

/// A server reply to a command along with its derived status.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    document: Document,
    ok: bool,
    error: Option<CommandError>,
}

impl Reply {
    /// Derives the status of a reply document. The `ok` field may be a boolean or a number; `true`
    /// and `1` mean success. A reply without a usable `ok` field is a [`ErrorKind::MalformedReply`].
    pub fn parse(document: Document) -> Result<Self> {
        let ok = match document.get("ok") {
            Some(Bson::Boolean(b)) => *b,
            Some(other) => match bson_util::get_int(other) {
                Some(i) => i == 1,
                None => {
                    return Err(Error::malformed_reply(format!(
                        "expected a boolean or integral \"ok\" field, got {}",
                        other
                    )))
                }
            },
            None => return Err(Error::malformed_reply("reply has no \"ok\" field")),
        };

        let error = if ok {
            None
        } else {
            let error: CommandError = crate::bson::from_document(document.clone())
                .map_err(|e| Error::malformed_reply(format!("invalid error reply: {}", e)))?;
            Some(error)
        };

        Ok(Self {
            document,
            ok,
            error,
        })
    }

    /// Whether the command succeeded or not (i.e. if this response is ok: 1).
    pub fn is_success(&self) -> bool {
        self.ok
    }

    /// The server error code, present only on failed replies that carried one.
    pub fn code(&self) -> Option<i32> {
        self.error.as_ref().and_then(|e| e.code)
    }

    /// The server error message, present only on failed replies.
    pub fn message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// The name associated with the server error code, if any.
    pub fn code_name(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.code_name.as_deref())
    }

    /// Labels the server attached to a failed reply.
    pub fn labels(&self) -> &[String] {
        self.error.as_ref().map(|e| e.labels.as_slice()).unwrap_or(&[])
    }

    /// The raw reply document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Converts the reply into the full reply document on success or
    /// [`ErrorKind::CommandFailed`] carrying the server's code and message verbatim.
    pub fn into_result(self) -> Result<Document> {
        match self.error {
            None => Ok(self.document),
            Some(error) => Err(ErrorKind::CommandFailed(error).into()),
        }
    }
}

/// Interprets a reply document, returning it unchanged if the server reported success.
pub fn interpret(document: Document) -> Result<Document> {
    Reply::parse(document)?.into_result()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{interpret, Reply};
    use crate::{
        bson::doc,
        error::{CommandError, ErrorKind},
    };

    #[test]
    fn ok_forms() {
        for document in [
            doc! { "ok": 1 },
            doc! { "ok": 1_i64 },
            doc! { "ok": 1.0 },
            doc! { "ok": true },
        ] {
            let reply = Reply::parse(document.clone()).unwrap();
            assert!(reply.is_success(), "{} should succeed", document);
            assert_eq!(reply.code(), None);
            assert_eq!(reply.message(), None);
        }

        for document in [doc! { "ok": 0 }, doc! { "ok": 0.0 }, doc! { "ok": false }] {
            assert!(!Reply::parse(document).unwrap().is_success());
        }
    }

    #[test]
    fn success_returns_whole_document() {
        let document = doc! { "ok": 1, "dropped": "test_db" };
        assert_eq!(interpret(document.clone()).unwrap(), document);
    }

    #[test]
    fn failure_carries_server_values() {
        let document = doc! {
            "ok": 0,
            "errmsg": "ns not found",
            "code": 26,
            "codeName": "NamespaceNotFound",
            "errorLabels": ["Label"],
        };
        let reply = Reply::parse(document.clone()).unwrap();
        assert_eq!(reply.code(), Some(26));
        assert_eq!(reply.message(), Some("ns not found"));
        assert_eq!(reply.code_name(), Some("NamespaceNotFound"));
        assert_eq!(reply.labels(), ["Label".to_string()]);
        assert_eq!(reply.document(), &document);

        let err = reply.into_result().unwrap_err();
        match *err.kind {
            ErrorKind::CommandFailed(ref error) => assert_eq!(
                error,
                &CommandError {
                    code: Some(26),
                    code_name: Some("NamespaceNotFound".to_string()),
                    message: "ns not found".to_string(),
                    labels: vec!["Label".to_string()],
                }
            ),
            ref other => panic!("expected command failure, got {:?}", other),
        }
        assert!(err.is_ns_not_found());
        assert!(err.is_server_error());
    }

    #[test]
    fn failure_without_details() {
        let err = interpret(doc! { "ok": 0 }).unwrap_err();
        assert_eq!(err.code(), None);
        assert!(matches!(*err.kind, ErrorKind::CommandFailed(_)));
    }

    #[test]
    fn malformed_replies() {
        for document in [doc! {}, doc! { "ok": "yes" }, doc! { "ok": null }] {
            let err = Reply::parse(document).unwrap_err();
            assert!(
                matches!(*err.kind, ErrorKind::MalformedReply { .. }),
                "expected malformed reply, got {:?}",
                err
            );
        }
    }
}
